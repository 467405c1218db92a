use chrono::NaiveDate;

use crate::models::Application;

const HEADERS: [&str; 9] = [
    "Company",
    "Position",
    "Status",
    "Applied Date",
    "Source",
    "Job Link",
    "Notes",
    "Reminder Date",
    "Reminder Note",
];

/// Render the full collection as CSV. Every value is double-quoted with
/// embedded quotes doubled, so commas and newlines in notes survive a
/// round trip through the importer.
pub fn to_csv(apps: &[Application]) -> String {
    let mut out = String::new();
    out.push_str(&HEADERS.join(","));
    out.push('\n');
    for app in apps {
        let row = [
            escape(&app.company),
            escape(&app.position),
            escape(app.status.as_str()),
            escape(&app.applied_date.to_string()),
            escape(app.source.as_deref().unwrap_or("")),
            escape(app.job_link.as_deref().unwrap_or("")),
            escape(app.notes.as_deref().unwrap_or("")),
            escape(
                &app.reminder_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
            ),
            escape(app.reminder_note.as_deref().unwrap_or("")),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

pub fn default_filename(today: NaiveDate) -> String {
    format!("job_applications_{today}.csv")
}

fn escape(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
