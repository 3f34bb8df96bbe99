mod patient;
