mod board;
mod export;
mod import;
mod merge;
mod models;
mod notify;
mod query;
mod remind;
mod store;
mod summary;
mod sync;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use models::{new_record_id, Application, Filter, Status};
use store::{keys, KeyValue, RecordStore, SqliteStore};

#[derive(Parser)]
#[command(name = "apptrack")]
#[command(about = "Track job applications - list, board, reminders, import/export, cloud sync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the local store
    Init,

    /// Add an application
    Add {
        /// Company name
        company: String,

        /// Position title
        position: String,

        /// Date applied, YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        applied: Option<String>,

        /// Status (Applied, Interviewing, Offer, Rejected)
        #[arg(short, long, default_value = "Applied")]
        status: String,

        /// Where the posting was found
        #[arg(long)]
        source: Option<String>,

        /// Link to the posting
        #[arg(long)]
        link: Option<String>,

        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Follow-up reminder date, YYYY-MM-DD
        #[arg(short, long)]
        reminder: Option<String>,

        /// Note attached to the reminder
        #[arg(long)]
        reminder_note: Option<String>,
    },

    /// List applications
    List {
        /// Substring match against company, position, and notes
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by status (Applied, Interviewing, Offer, Rejected)
        #[arg(long)]
        status: Option<String>,

        /// Earliest applied date, YYYY-MM-DD (inclusive)
        #[arg(long)]
        from: Option<String>,

        /// Latest applied date, YYYY-MM-DD (inclusive)
        #[arg(long)]
        to: Option<String>,

        /// Page number, 10 applications per page
        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Show one application in full
    Show {
        /// Application id (or unique prefix)
        id: String,
    },

    /// Edit fields of an application
    Edit {
        /// Application id (or unique prefix)
        id: String,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        position: Option<String>,

        /// Date applied, YYYY-MM-DD
        #[arg(long)]
        applied: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        link: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Follow-up reminder date, YYYY-MM-DD
        #[arg(long)]
        reminder: Option<String>,

        #[arg(long)]
        reminder_note: Option<String>,

        /// Drop the reminder date and note
        #[arg(long)]
        clear_reminder: bool,
    },

    /// Change just the status of an application
    Status {
        /// Application id (or unique prefix)
        id: String,

        /// New status (Applied, Interviewing, Offer, Rejected)
        status: String,
    },

    /// Delete an application (no undo)
    Delete {
        /// Application id (or unique prefix)
        id: String,
    },

    /// Interactive kanban board
    Board,

    /// Reminders and follow-ups
    Remind {
        #[command(subcommand)]
        command: RemindCommands,
    },

    /// Import applications from a CSV file
    Import {
        /// Path to the CSV file
        file: PathBuf,

        /// Fail the whole import if any row has to be skipped
        #[arg(long)]
        strict: bool,

        /// Show what would be imported without importing
        #[arg(long)]
        dry_run: bool,
    },

    /// Export all applications as CSV
    Export {
        /// Output file (defaults to job_applications_<today>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sync with the connected cloud drive
    Sync,

    /// Manage the cloud drive connection
    Drive {
        #[command(subcommand)]
        command: DriveCommands,
    },

    /// AI summary of your search progress
    Summary {
        /// Store an API key for the AI provider and exit
        #[arg(long)]
        set_key: Option<String>,
    },

    /// Counts by status
    Stats,
}

#[derive(Subcommand)]
enum RemindCommands {
    /// Upcoming and overdue reminders, plus follow-up nudges
    List,

    /// Emit notifications for reminders due today (once per day)
    Check,
}

#[derive(Subcommand)]
enum DriveCommands {
    /// Store a drive access token
    Login {
        /// OAuth access token for the drive provider
        #[arg(long)]
        token: String,
    },

    /// Forget the stored token
    Logout,

    /// Show connection and last-sync state
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let kv = SqliteStore::open()?;
    let store_path = kv.path().clone();
    let mut store = RecordStore::load(kv)?;

    match cli.command {
        Commands::Init => {
            println!("Store initialized at {}", store_path.display());
        }

        Commands::Add {
            company,
            position,
            applied,
            status,
            source,
            link,
            notes,
            reminder,
            reminder_note,
        } => {
            let company = require_text("company", &company)?;
            let position = require_text("position", &position)?;
            let applied_date = match applied {
                Some(s) => parse_date_arg(&s)?,
                None => Local::now().date_naive(),
            };
            let app = Application {
                id: new_record_id(Utc::now()),
                company,
                position,
                applied_date,
                status: parse_status_arg(&status)?,
                source,
                job_link: link,
                notes,
                reminder_date: reminder.as_deref().map(parse_date_arg).transpose()?,
                reminder_note,
            };
            let id = app.id.clone();
            store.add(app)?;
            println!("Added application {id}");
        }

        Commands::List {
            search,
            status,
            from,
            to,
            page,
        } => {
            let filter = Filter {
                search: search.unwrap_or_default(),
                status: status.as_deref().map(parse_status_arg).transpose()?,
                start_date: from.as_deref().map(parse_date_arg).transpose()?,
                end_date: to.as_deref().map(parse_date_arg).transpose()?,
            };
            let filtered = query::filter_and_sort(store.applications(), &filter);
            let total_pages = filtered.len().div_ceil(query::PAGE_SIZE).max(1);
            if page < 1 || page > total_pages {
                bail!("page {} is out of range (1-{})", page, total_pages);
            }
            let view = query::paginate(filtered, page, query::PAGE_SIZE);

            if view.total_count == 0 {
                println!("No matching applications found.");
            } else {
                let today = Local::now().date_naive();
                println!(
                    "{:<26} {:<13} {:<24} {:<20} {:<10} {}",
                    "ID", "STATUS", "POSITION", "COMPANY", "APPLIED", "FLAGS"
                );
                println!("{}", "-".repeat(104));
                for app in &view.items {
                    let mut flags = Vec::new();
                    if remind::needs_follow_up(app, today) {
                        flags.push("follow-up");
                    }
                    if app.reminder_date.is_some_and(|d| d < today) {
                        flags.push("overdue");
                    }
                    println!(
                        "{:<26} {:<13} {:<24} {:<20} {:<10} {}",
                        app.id,
                        app.status,
                        truncate(&app.position, 22),
                        truncate(&app.company, 18),
                        app.applied_date,
                        flags.join(",")
                    );
                }
                println!(
                    "\nPage {} of {} ({} application{})",
                    view.page,
                    view.total_pages,
                    view.total_count,
                    if view.total_count == 1 { "" } else { "s" }
                );
            }
        }

        Commands::Show { id } => {
            let id = store.resolve_id(&id)?;
            let app = store
                .find(&id)
                .ok_or_else(|| anyhow!("application {} not found", id))?;
            println!("Application {}", app.id);
            println!("Company: {}", app.company);
            println!("Position: {}", app.position);
            println!("Status: {}", app.status);
            println!("Applied: {}", app.applied_date);
            if let Some(source) = &app.source {
                println!("Source: {source}");
            }
            if let Some(link) = &app.job_link {
                println!("Link: {link}");
            }
            if let Some(reminder) = app.reminder_date {
                match &app.reminder_note {
                    Some(note) => println!("Reminder: {reminder} ({note})"),
                    None => println!("Reminder: {reminder}"),
                }
            }
            if remind::needs_follow_up(app, Local::now().date_naive()) {
                println!("Needs follow-up: applied over a week ago, still no reply");
            }
            if let Some(notes) = &app.notes {
                println!("\n--- Notes ---\n{notes}");
            }
        }

        Commands::Edit {
            id,
            company,
            position,
            applied,
            status,
            source,
            link,
            notes,
            reminder,
            reminder_note,
            clear_reminder,
        } => {
            let id = store.resolve_id(&id)?;
            let mut app = store
                .find(&id)
                .cloned()
                .ok_or_else(|| anyhow!("application {} not found", id))?;

            if let Some(value) = company {
                app.company = require_text("company", &value)?;
            }
            if let Some(value) = position {
                app.position = require_text("position", &value)?;
            }
            if let Some(value) = applied {
                app.applied_date = parse_date_arg(&value)?;
            }
            if let Some(value) = status {
                app.status = parse_status_arg(&value)?;
            }
            if let Some(value) = source {
                app.source = Some(value);
            }
            if let Some(value) = link {
                app.job_link = Some(value);
            }
            if let Some(value) = notes {
                app.notes = Some(value);
            }
            if let Some(value) = reminder {
                app.reminder_date = Some(parse_date_arg(&value)?);
            }
            if let Some(value) = reminder_note {
                app.reminder_note = Some(value);
            }
            if clear_reminder {
                app.reminder_date = None;
                app.reminder_note = None;
            }

            store.update(app)?;
            println!("Updated application {id}");
        }

        Commands::Status { id, status } => {
            let id = store.resolve_id(&id)?;
            let status = parse_status_arg(&status)?;
            store.update_status(&id, status)?;
            println!("Application {id} is now {status}");
        }

        Commands::Delete { id } => {
            let id = store.resolve_id(&id)?;
            store.remove(&id)?;
            println!("Deleted application {id}");
        }

        Commands::Board => {
            board::run_board(&mut store)?;
        }

        Commands::Remind { command } => {
            let today = Local::now().date_naive();
            match command {
                RemindCommands::List => {
                    let upcoming = remind::upcoming_reminders(store.applications(), today);
                    let overdue = remind::overdue_reminders(store.applications(), today);
                    let follow_ups: Vec<&Application> = store
                        .applications()
                        .iter()
                        .filter(|app| remind::needs_follow_up(app, today))
                        .collect();

                    if upcoming.is_empty() && overdue.is_empty() && follow_ups.is_empty() {
                        println!("Nothing needs attention this week.");
                    }
                    if !overdue.is_empty() {
                        println!("Overdue:");
                        for app in &overdue {
                            print_reminder_line(app);
                        }
                    }
                    if !upcoming.is_empty() {
                        println!("Next 7 days:");
                        for app in &upcoming {
                            print_reminder_line(app);
                        }
                    }
                    if !follow_ups.is_empty() {
                        println!("Still waiting to hear back (applied over a week ago):");
                        for app in &follow_ups {
                            println!(
                                "  {} at {} (applied {})",
                                app.position, app.company, app.applied_date
                            );
                        }
                    }
                }

                RemindCommands::Check => {
                    let apps = store.applications().to_vec();
                    let emitted = notify::check_due_reminders(
                        &apps,
                        today,
                        store.kv_mut(),
                        &notify::TerminalNotifier,
                    )?;
                    println!("{emitted} reminder(s) due today.");
                }
            }
        }

        Commands::Import {
            file,
            strict,
            dry_run,
        } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read CSV file: {}", file.display()))?;
            let batch = new_record_id(Utc::now());
            let outcome = import::parse_csv(&text, &batch)?;

            if !outcome.skipped.is_empty() {
                for skip in &outcome.skipped {
                    eprintln!("  row {}: {}", skip.row, skip.reason);
                }
                if strict {
                    bail!(
                        "{} row(s) could not be imported; fix them or drop --strict",
                        outcome.skipped.len()
                    );
                }
            }

            let parsed = outcome.applications.len();
            let fresh = import::dedupe_against(store.applications(), outcome.applications);
            let duplicates = parsed - fresh.len();

            if dry_run {
                for app in &fresh {
                    println!(
                        "[DRY RUN] Would import: {} at {} ({})",
                        app.position, app.company, app.applied_date
                    );
                }
                println!(
                    "\n{} new, {} duplicate(s), {} skipped row(s). (Dry run - nothing imported)",
                    fresh.len(),
                    duplicates,
                    outcome.skipped.len()
                );
            } else {
                let added = fresh.len();
                store.append_all(fresh)?;
                println!(
                    "{} new applications imported ({} duplicate(s) discarded, {} row(s) skipped).",
                    added,
                    duplicates,
                    outcome.skipped.len()
                );
            }
        }

        Commands::Export { output } => {
            let today = Local::now().date_naive();
            let path = output.unwrap_or_else(|| PathBuf::from(export::default_filename(today)));
            let csv = export::to_csv(store.applications());
            std::fs::write(&path, csv)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
            println!(
                "Exported {} application(s) to {}",
                store.applications().len(),
                path.display()
            );
        }

        Commands::Sync => {
            let Some(token) = drive_token(store.kv())? else {
                bail!("not connected to a drive; run 'apptrack drive login' first");
            };
            let client = sync::DriveClient::new(token);
            let report = sync::run_sync(&mut store, &client, Utc::now())?;

            if report.remote_corrupt {
                eprintln!("warning: remote data file was unreadable and has been rewritten");
            }
            if report.created_remote {
                println!("No remote data file found; created one.");
            }
            println!("Sync successful! {} total applications.", report.total);
        }

        Commands::Drive { command } => match command {
            DriveCommands::Login { token } => {
                store.kv_mut().set(keys::DRIVE_TOKEN, token.trim())?;
                println!("Connected. Run 'apptrack sync' to merge with the drive copy.");
            }
            DriveCommands::Logout => {
                store.kv_mut().remove(keys::DRIVE_TOKEN)?;
                store.kv_mut().remove(keys::LAST_SYNC)?;
                println!("Disconnected from the drive.");
            }
            DriveCommands::Status => {
                match drive_token(store.kv())? {
                    Some(_) => println!("Connected to the drive."),
                    None => println!("Not connected. Run 'apptrack drive login' to connect."),
                }
                match store.last_sync()? {
                    Some(at) => println!("Last sync: {}", at.with_timezone(&Local)),
                    None => println!("Never synced."),
                }
            }
        },

        Commands::Summary { set_key } => {
            if let Some(key) = set_key {
                store.kv_mut().set(keys::AI_KEY, key.trim())?;
                println!("AI key stored.");
                return Ok(());
            }
            match ai_key(store.kv())? {
                Some(key) => {
                    let provider = summary::GeminiProvider::new(key);
                    let text = summary::generate_summary(&provider, store.applications())?;
                    println!("{text}");
                }
                None => println!("{}", summary::DISABLED_MESSAGE),
            }
        }

        Commands::Stats => {
            let apps = store.applications();
            let count = |status: Status| apps.iter().filter(|a| a.status == status).count();
            println!("Total applied:  {}", apps.len());
            println!("Pending reply:  {}", count(Status::Applied));
            println!("Interviewing:   {}", count(Status::Interviewing));
            println!("Offers:         {}", count(Status::Offer));
        }
    }

    Ok(())
}

fn print_reminder_line(app: &Application) {
    let due = app
        .reminder_date
        .map(|d| d.to_string())
        .unwrap_or_default();
    match &app.reminder_note {
        Some(note) => println!("  {} - {} at {} ({})", due, app.position, app.company, note),
        None => println!("  {} - {} at {}", due, app.position, app.company),
    }
}

/// Environment variable wins over the stored token.
fn drive_token<S: KeyValue>(kv: &S) -> Result<Option<String>> {
    if let Ok(token) = std::env::var("APPTRACK_DRIVE_TOKEN") {
        if !token.trim().is_empty() {
            return Ok(Some(token.trim().to_string()));
        }
    }
    kv.get(keys::DRIVE_TOKEN)
}

fn ai_key<S: KeyValue>(kv: &S) -> Result<Option<String>> {
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.trim().is_empty() {
            return Ok(Some(key.trim().to_string()));
        }
    }
    kv.get(keys::AI_KEY)
}

fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{} must not be empty", field);
    }
    Ok(trimmed.to_string())
}

fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

fn parse_status_arg(s: &str) -> Result<Status> {
    Status::parse(s)
        .ok_or_else(|| anyhow!("unknown status '{}'. Valid: Applied, Interviewing, Offer, Rejected", s))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
