use anyhow::Result;
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;

use crate::models::Application;
use crate::store::{keys, KeyValue};

/// Shown-markers older than this are pruned on every check.
const MARKER_RETENTION_DAYS: i64 = 7;

pub trait Notifier {
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Prints to the terminal. The closest a CLI gets to a desktop toast.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        println!("[reminder] {title}: {body}");
        Ok(())
    }
}

/// Emit a notification for every reminder due today that has not already
/// been emitted today, then remember it. Markers are keyed by
/// `(record id, reminder date)` and stored as one JSON map in the
/// substrate, so repeated checks on the same day stay silent.
///
/// Reminders are always recomputed from the live collection at check time:
/// one that was edited or deleted since the last check simply never fires.
pub fn check_due_reminders<S: KeyValue>(
    apps: &[Application],
    today: NaiveDate,
    kv: &mut S,
    notifier: &dyn Notifier,
) -> Result<usize> {
    let mut markers = load_markers(kv)?;
    let mut emitted = 0;

    for app in apps {
        if app.reminder_date != Some(today) {
            continue;
        }
        let marker = format!("{}-{}", app.id, today);
        if markers.contains_key(&marker) {
            continue;
        }
        let body = match &app.reminder_note {
            Some(note) => format!("{} at {} - {}", app.position, app.company, note),
            None => format!("{} at {}", app.position, app.company),
        };
        notifier.notify("Job application reminder", &body)?;
        markers.insert(marker, today);
        emitted += 1;
    }

    let cutoff = today - Duration::days(MARKER_RETENTION_DAYS);
    markers.retain(|_, shown_on| *shown_on >= cutoff);

    save_markers(kv, &markers)?;
    Ok(emitted)
}

fn load_markers<S: KeyValue>(kv: &S) -> Result<HashMap<String, NaiveDate>> {
    match kv.get(keys::NOTIFIED)? {
        Some(blob) => Ok(serde_json::from_str(&blob).unwrap_or_default()),
        None => Ok(HashMap::new()),
    }
}

fn save_markers<S: KeyValue>(kv: &mut S, markers: &HashMap<String, NaiveDate>) -> Result<()> {
    kv.set(keys::NOTIFIED, &serde_json::to_string(markers)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use crate::store::MemoryStore;
    use std::cell::RefCell;

    struct RecordingNotifier {
        bodies: RefCell<Vec<String>>,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            Self {
                bodies: RefCell::new(Vec::new()),
            }
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, _title: &str, body: &str) -> Result<()> {
            self.bodies.borrow_mut().push(body.to_string());
            Ok(())
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn app(id: &str, reminder: Option<&str>, note: Option<&str>) -> Application {
        Application {
            id: id.to_string(),
            company: "Acme".to_string(),
            position: "Engineer".to_string(),
            applied_date: date("2024-01-01"),
            status: Status::Applied,
            source: None,
            job_link: None,
            notes: None,
            reminder_date: reminder.map(date),
            reminder_note: note.map(str::to_string),
        }
    }

    #[test]
    fn test_due_today_fires_once_per_day() {
        let today = date("2024-03-10");
        let apps = vec![
            app("a1", Some("2024-03-10"), Some("chase recruiter")),
            app("a2", Some("2024-03-12"), None),
            app("a3", None, None),
        ];
        let mut kv = MemoryStore::default();
        let notifier = RecordingNotifier::new();

        let first = check_due_reminders(&apps, today, &mut kv, &notifier).unwrap();
        assert_eq!(first, 1);
        assert_eq!(
            notifier.bodies.borrow()[0],
            "Engineer at Acme - chase recruiter"
        );

        // Second check the same day stays silent.
        let second = check_due_reminders(&apps, today, &mut kv, &notifier).unwrap();
        assert_eq!(second, 0);
    }

    #[test]
    fn test_rescheduled_reminder_fires_again() {
        let mut kv = MemoryStore::default();
        let notifier = RecordingNotifier::new();

        let apps = vec![app("a1", Some("2024-03-10"), None)];
        check_due_reminders(&apps, date("2024-03-10"), &mut kv, &notifier).unwrap();

        // Same record, reminder moved to a later day: a new marker key.
        let apps = vec![app("a1", Some("2024-03-15"), None)];
        let emitted =
            check_due_reminders(&apps, date("2024-03-15"), &mut kv, &notifier).unwrap();
        assert_eq!(emitted, 1);
    }

    #[test]
    fn test_old_markers_are_pruned() {
        let mut kv = MemoryStore::default();
        let notifier = RecordingNotifier::new();

        let apps = vec![app("a1", Some("2024-03-01"), None)];
        check_due_reminders(&apps, date("2024-03-01"), &mut kv, &notifier).unwrap();

        // A check eight days later prunes the stale marker.
        check_due_reminders(&[], date("2024-03-09"), &mut kv, &notifier).unwrap();
        let markers: HashMap<String, NaiveDate> =
            serde_json::from_str(&kv.get(keys::NOTIFIED).unwrap().unwrap()).unwrap();
        assert!(markers.is_empty());
    }

    #[test]
    fn test_deleted_reminder_never_fires() {
        let mut kv = MemoryStore::default();
        let notifier = RecordingNotifier::new();

        // The reminder existed yesterday but was deleted before today's
        // check; the live collection is all that matters.
        let emitted =
            check_due_reminders(&[], date("2024-03-10"), &mut kv, &notifier).unwrap();
        assert_eq!(emitted, 0);
        assert!(notifier.bodies.borrow().is_empty());
    }
}
