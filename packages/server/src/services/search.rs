use crate::entity::patient;

/// Records matching a free-text search, in their original order.
///
/// A record matches when the lowercased query is a substring of its name,
/// parent name or OP number (lowercased), or of its age in decimal. A blank
/// query matches everything.
pub fn filter<'a>(records: &'a [patient::Model], query: &str) -> Vec<&'a patient::Model> {
    if query.trim().is_empty() {
        return records.iter().collect();
    }

    let needle = query.to_lowercase();
    records.iter().filter(|r| matches(r, &needle)).collect()
}

fn matches(record: &patient::Model, needle: &str) -> bool {
    let contains = |field: Option<&str>| {
        field.is_some_and(|value| value.to_lowercase().contains(needle))
    };

    contains(Some(&record.name))
        || contains(record.parent_name.as_deref())
        || contains(record.op_number.as_deref())
        || record.age.to_string().contains(needle)
}
