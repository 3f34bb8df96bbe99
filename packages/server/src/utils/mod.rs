pub mod csv;
pub mod jwt;
