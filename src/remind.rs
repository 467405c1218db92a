use chrono::{Duration, NaiveDate};

use crate::models::{Application, Status};

/// Reminders up to this many days out count as "upcoming".
pub const UPCOMING_WINDOW_DAYS: i64 = 7;
/// An application still in `Applied` after this many days needs a nudge.
pub const FOLLOW_UP_AFTER_DAYS: i64 = 7;

/// Reminders falling inside `[today, today + 7]`, both ends inclusive,
/// soonest first. All comparisons are calendar-date-only, so time-of-day
/// and timezone never shift a reminder across a day boundary.
pub fn upcoming_reminders(apps: &[Application], today: NaiveDate) -> Vec<Application> {
    let horizon = today + Duration::days(UPCOMING_WINDOW_DAYS);
    let mut out: Vec<Application> = apps
        .iter()
        .filter(|app| {
            app.reminder_date
                .is_some_and(|d| d >= today && d <= horizon)
        })
        .cloned()
        .collect();
    out.sort_by_key(|app| app.reminder_date);
    out
}

/// Reminders strictly before today.
pub fn overdue_reminders(apps: &[Application], today: NaiveDate) -> Vec<Application> {
    let mut out: Vec<Application> = apps
        .iter()
        .filter(|app| app.reminder_date.is_some_and(|d| d < today))
        .cloned()
        .collect();
    out.sort_by_key(|app| app.reminder_date);
    out
}

/// More than a week in `Applied` with no status change. Independent of any
/// reminder the user may have set.
pub fn needs_follow_up(app: &Application, today: NaiveDate) -> bool {
    app.status == Status::Applied
        && (today - app.applied_date).num_days() > FOLLOW_UP_AFTER_DAYS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn app_with_reminder(id: &str, reminder: Option<&str>) -> Application {
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
            reminder_note: None,
        }
    }

    #[test]
    fn test_reminder_today_is_upcoming() {
        let today = date("2024-03-10");
        let apps = vec![app_with_reminder("1", Some("2024-03-10"))];
        assert_eq!(upcoming_reminders(&apps, today).len(), 1);
        assert!(overdue_reminders(&apps, today).is_empty());
    }

    #[test]
    fn test_reminder_yesterday_is_overdue_not_upcoming() {
        let today = date("2024-03-10");
        let apps = vec![app_with_reminder("1", Some("2024-03-09"))];
        assert!(upcoming_reminders(&apps, today).is_empty());
        assert_eq!(overdue_reminders(&apps, today).len(), 1);
    }

    #[test]
    fn test_window_edges() {
        let today = date("2024-03-10");
        let apps = vec![
            app_with_reminder("boundary", Some("2024-03-17")), // today + 7, in
            app_with_reminder("past-window", Some("2024-03-18")), // today + 8, out
        ];
        let upcoming = upcoming_reminders(&apps, today);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, "boundary");
    }

    #[test]
    fn test_upcoming_sorted_soonest_first() {
        let today = date("2024-03-10");
        let apps = vec![
            app_with_reminder("later", Some("2024-03-15")),
            app_with_reminder("sooner", Some("2024-03-11")),
            app_with_reminder("none", None),
        ];
        let upcoming = upcoming_reminders(&apps, today);
        let ids: Vec<&str> = upcoming.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["sooner", "later"]);
    }

    #[test]
    fn test_no_reminder_date_never_fires() {
        let today = date("2024-03-10");
        let mut app = app_with_reminder("1", None);
        app.reminder_note = Some("orphan note".to_string());
        let apps = vec![app];
        assert!(upcoming_reminders(&apps, today).is_empty());
        assert!(overdue_reminders(&apps, today).is_empty());
    }

    #[test]
    fn test_follow_up_after_a_week_in_applied() {
        let today = date("2024-01-11"); // 10 days after applying
        let mut app = app_with_reminder("1", None);
        assert!(needs_follow_up(&app, today));

        app.status = Status::Interviewing;
        assert!(!needs_follow_up(&app, today));
    }

    #[test]
    fn test_follow_up_boundary_is_strictly_more_than_seven_days() {
        let mut app = app_with_reminder("1", None);
        app.applied_date = date("2024-01-01");
        assert!(!needs_follow_up(&app, date("2024-01-08"))); // exactly 7
        assert!(needs_follow_up(&app, date("2024-01-09"))); // 8 days
    }
}
