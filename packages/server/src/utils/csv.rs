use crate::entity::patient;

pub const EXPORT_FILE_NAME: &str = "smile-tracker-patients.csv";

const HEADER: [&str; 9] = [
    "id",
    "name",
    "age",
    "parent_name",
    "op_number",
    "contact_details",
    "treatment",
    "notes",
    "image_url",
];

/// Render records as CSV with a header row. Absent fields are empty cells.
pub fn patients_to_csv(records: &[patient::Model]) -> String {
    let mut out = String::new();
    push_row(&mut out, HEADER.iter().copied());

    for r in records {
        let id = r.id.to_string();
        let age = r.age.to_string();
        push_row(
            &mut out,
            [
                id.as_str(),
                r.name.as_str(),
                age.as_str(),
                r.parent_name.as_deref().unwrap_or_default(),
                r.op_number.as_deref().unwrap_or_default(),
                r.contact_details.as_str(),
                r.treatment.as_deref().unwrap_or_default(),
                r.notes.as_deref().unwrap_or_default(),
                r.image_url.as_deref().unwrap_or_default(),
            ],
        );
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl IntoIterator<Item = &'a str>) {
    for (i, cell) in cells.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_cell(out, cell);
    }
    out.push_str("\r\n");
}

/// RFC 4180 quoting: cells containing a separator, quote or line break are
/// wrapped in quotes with inner quotes doubled.
fn push_cell(out: &mut String, cell: &str) {
    if cell.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&cell.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(cell);
    }
}
