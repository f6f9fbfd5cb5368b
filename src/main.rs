mod tui;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use jobtrack::conf::Settings;
use jobtrack::error::Error;
use jobtrack::models::{
    ApplicationPatch, EmploymentType, JobApplication, NewApplication, Platform, Status,
};
use jobtrack::store::open_store;
use jobtrack::tracker::Tracker;
use jobtrack::views::{follow_up_urgency, visible, DashboardStats, Filter, Urgency};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Job application tracker - record, filter, and review your applications")]
struct Cli {
    /// Act as this user (overrides JOBTRACK_USER_ID)
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new application
    Add {
        /// Job title
        job_title: String,

        /// Company name
        company: String,

        /// Where the job was found (linkedin, email, website, referral, recruiter, indeed, glassdoor, other)
        #[arg(short, long, default_value = "linkedin")]
        platform: Platform,

        /// Location
        #[arg(short, long, default_value = "")]
        location: String,

        /// Employment type (full-time, part-time, contract, remote, hybrid)
        #[arg(short, long, default_value = "full-time")]
        employment_type: EmploymentType,

        /// Date applied (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date_applied: Option<NaiveDate>,

        /// Status (wishlist, applied, screening, interview1, interview2, offer, rejected, withdrawn)
        #[arg(short, long, default_value = "applied")]
        status: Status,

        #[command(flatten)]
        details: Details,
    },

    /// List applications, most recently updated first
    List {
        /// Search job titles and companies
        #[arg(short, long, default_value = "")]
        search: String,

        /// Only this status
        #[arg(long)]
        status: Option<Status>,

        /// Only this platform
        #[arg(long)]
        platform: Option<Platform>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show application details
    Show {
        /// Application id or unique id prefix
        id: String,
    },

    /// Change fields of an application
    Update {
        /// Application id or unique id prefix
        id: String,

        #[arg(long)]
        job_title: Option<String>,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        platform: Option<Platform>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        employment_type: Option<EmploymentType>,

        #[arg(long)]
        date_applied: Option<NaiveDate>,

        #[arg(long)]
        status: Option<Status>,

        #[command(flatten)]
        details: Details,

        /// Clear an optional field (repeatable)
        #[arg(long, value_enum)]
        clear: Vec<OptionalField>,
    },

    /// Move an application to another status
    Status {
        /// Application id or unique id prefix
        id: String,

        status: Status,
    },

    /// Delete an application
    Delete {
        /// Application id or unique id prefix
        id: String,
    },

    /// Show dashboard numbers
    Stats,

    /// Export all applications to CSV
    Export {
        /// Directory to write into (defaults to JOBTRACK_EXPORT_DIR or .)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Browse applications on a kanban board
    Board,

    /// Show the signed-in user and backend
    Whoami,
}

impl Commands {
    /// Commands that act on a specific loaded record or write the list out.
    /// The rest carry on with an empty list when loading fails.
    fn needs_list(&self) -> bool {
        matches!(
            self,
            Commands::Show { .. }
                | Commands::Update { .. }
                | Commands::Status { .. }
                | Commands::Delete { .. }
                | Commands::Export { .. }
        )
    }
}

/// Optional fields shared by `add` and `update`.
#[derive(Args, Default)]
struct Details {
    /// Link to the posting
    #[arg(long)]
    job_url: Option<String>,

    /// Last time you heard from them (YYYY-MM-DD)
    #[arg(long)]
    last_contact: Option<NaiveDate>,

    /// When to follow up (YYYY-MM-DD)
    #[arg(long)]
    follow_up: Option<NaiveDate>,

    #[arg(long)]
    next_action: Option<String>,

    #[arg(long)]
    contact_name: Option<String>,

    #[arg(long)]
    contact_email: Option<String>,

    #[arg(long)]
    contact_linkedin: Option<String>,

    #[arg(long)]
    notes: Option<String>,

    #[arg(long)]
    salary_range: Option<String>,

    #[arg(long)]
    key_requirements: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OptionalField {
    JobUrl,
    LastContact,
    FollowUp,
    NextAction,
    ContactName,
    ContactEmail,
    ContactLinkedin,
    Notes,
    SalaryRange,
    KeyRequirements,
}

fn build_patch(
    mut patch: ApplicationPatch,
    details: Details,
    clear: &[OptionalField],
) -> ApplicationPatch {
    patch.job_url = details.job_url.map(Some);
    patch.last_contact_date = details.last_contact.map(Some);
    patch.follow_up_due_date = details.follow_up.map(Some);
    patch.next_action = details.next_action.map(Some);
    patch.contact_name = details.contact_name.map(Some);
    patch.contact_email = details.contact_email.map(Some);
    patch.contact_linkedin = details.contact_linkedin.map(Some);
    patch.notes = details.notes.map(Some);
    patch.salary_range = details.salary_range.map(Some);
    patch.key_requirements = details.key_requirements.map(Some);

    for field in clear {
        match field {
            OptionalField::JobUrl => patch.job_url = Some(None),
            OptionalField::LastContact => patch.last_contact_date = Some(None),
            OptionalField::FollowUp => patch.follow_up_due_date = Some(None),
            OptionalField::NextAction => patch.next_action = Some(None),
            OptionalField::ContactName => patch.contact_name = Some(None),
            OptionalField::ContactEmail => patch.contact_email = Some(None),
            OptionalField::ContactLinkedin => patch.contact_linkedin = Some(None),
            OptionalField::Notes => patch.notes = Some(None),
            OptionalField::SalaryRange => patch.salary_range = Some(None),
            OptionalField::KeyRequirements => patch.key_requirements = Some(None),
        }
    }

    patch
}

/// Print queued notices; true if there were any.
fn report_notices(tracker: &mut Tracker) -> bool {
    let notices = tracker.take_notices();
    for notice in &notices {
        eprintln!("error: {}", notice);
    }
    !notices.is_empty()
}

fn resolve<'a>(tracker: &'a Tracker, id: &str) -> Result<&'a JobApplication> {
    tracker
        .find(id)
        .ok_or_else(|| anyhow!("No single application matches '{}'", id))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::new().context("Failed to read settings")?;
    if let Some(user) = cli.user {
        settings.user_id = Some(user);
    }

    let Some(session) = settings.session() else {
        return Err(Error::AuthRequired).context("Set JOBTRACK_USER_ID or pass --user to sign in");
    };

    let store = open_store(&settings)?;
    let mut tracker = Tracker::new(store);
    tracker.sign_in(session);
    if report_notices(&mut tracker) && cli.command.needs_list() {
        bail!("Could not load applications");
    }

    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Add {
            job_title,
            company,
            platform,
            location,
            employment_type,
            date_applied,
            status,
            details,
        } => {
            let mut fields = NewApplication::new(
                job_title,
                company,
                platform,
                date_applied.unwrap_or(today),
            );
            fields.location = location;
            fields.employment_type = employment_type;
            fields.status = status;
            fields.job_url = details.job_url;
            fields.last_contact_date = details.last_contact;
            fields.follow_up_due_date = details.follow_up;
            fields.next_action = details.next_action;
            fields.contact_name = details.contact_name;
            fields.contact_email = details.contact_email;
            fields.contact_linkedin = details.contact_linkedin;
            fields.notes = details.notes;
            fields.salary_range = details.salary_range;
            fields.key_requirements = details.key_requirements;

            match tracker.add(fields) {
                Some(app) => println!("Added {} ({} at {})", short_id(&app), app.job_title, app.company),
                None => {
                    report_notices(&mut tracker);
                    bail!("Application was not added");
                }
            }
        }

        Commands::List {
            search,
            status,
            platform,
            json,
        } => {
            let filter = Filter {
                search,
                status,
                platform,
            };
            let shown = visible(tracker.applications(), &filter);

            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else if shown.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<9} {:<16} {:<28} {:<20} {:<16} {:<10} {:<12}",
                    "ID", "STATUS", "TITLE", "COMPANY", "PLATFORM", "APPLIED", "FOLLOW-UP"
                );
                println!("{}", "-".repeat(117));
                for app in &shown {
                    println!(
                        "{:<9} {:<16} {:<28} {:<20} {:<16} {:<10} {:<12}",
                        short_id(app),
                        app.status.label(),
                        truncate(&app.job_title, 26),
                        truncate(&app.company, 18),
                        app.platform.label(),
                        app.date_applied.format("%Y-%m-%d"),
                        follow_up_cell(app, today),
                    );
                }
            }
            if !json {
                println!(
                    "\nShowing {} of {} applications",
                    shown.len(),
                    tracker.applications().len()
                );
            }
        }

        Commands::Show { id } => {
            let app = resolve(&tracker, &id)?;
            print_application(app, today);
        }

        Commands::Update {
            id,
            job_title,
            company,
            platform,
            location,
            employment_type,
            date_applied,
            status,
            details,
            clear,
        } => {
            let app_id = resolve(&tracker, &id)?.id;
            let patch = ApplicationPatch {
                job_title,
                company,
                platform,
                location,
                employment_type,
                date_applied,
                status,
                ..ApplicationPatch::default()
            };
            let patch = build_patch(patch, details, &clear);
            if patch.is_empty() {
                println!("Nothing to change.");
                return Ok(());
            }

            if tracker.update(app_id, patch) {
                println!("Updated {}", app_id);
            } else {
                report_notices(&mut tracker);
                bail!("Application was not updated");
            }
        }

        Commands::Status { id, status } => {
            let app_id = resolve(&tracker, &id)?.id;
            if tracker.set_status(app_id, status) {
                println!("Moved {} to {}", app_id, status.label());
            } else {
                report_notices(&mut tracker);
                bail!("Status was not changed");
            }
        }

        Commands::Delete { id } => {
            let app = resolve(&tracker, &id)?;
            let (app_id, title) = (app.id, app.job_title.clone());
            if tracker.delete(app_id) {
                println!("Deleted {} ({})", app_id, title);
            } else {
                report_notices(&mut tracker);
                bail!("Application was not deleted");
            }
        }

        Commands::Stats => {
            let stats = DashboardStats::compute(tracker.applications(), today);
            println!("Applied this week:   {}", stats.applied_this_week);
            println!("In progress:         {}", stats.in_progress);
            println!("Offers:              {}", stats.offers);
            println!("Rejected:            {}", stats.rejected);
            println!("Overdue follow-ups:  {}", stats.overdue_follow_ups);
        }

        Commands::Export { dir } => {
            let dir = dir.unwrap_or_else(|| settings.export_dir());
            let export = tracker.export_csv(today);
            let path = dir.join(&export.file_name);
            std::fs::write(&path, &export.contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Exported {} applications to {}",
                tracker.applications().len(),
                path.display()
            );
        }

        Commands::Board => {
            tui::run_board(&mut tracker, today)?;
        }

        Commands::Whoami => {
            if let Some(session) = tracker.session() {
                println!("User:    {}", session.user_id());
            }
            println!("Backend: {}", tracker.store().backend_name());
            println!("Tracked: {} applications", tracker.applications().len());
        }
    }

    Ok(())
}

fn print_application(app: &JobApplication, today: NaiveDate) {
    println!("Application {}", app.id);
    println!("Title: {}", app.job_title);
    println!("Company: {}", app.company);
    println!("Status: {}", app.status.label());
    println!("Platform: {}", app.platform.label());
    if !app.location.is_empty() {
        println!("Location: {}", app.location);
    }
    println!("Employment: {}", app.employment_type.label());
    println!("Applied: {}", app.date_applied);
    if let Some(url) = &app.job_url {
        println!("URL: {}", url);
    }
    if let Some(date) = app.last_contact_date {
        println!("Last contact: {}", date);
    }
    if app.follow_up_due_date.is_some() {
        println!("Follow-up: {}", follow_up_cell(app, today));
    }
    if let Some(action) = &app.next_action {
        println!("Next action: {}", action);
    }
    if let Some(name) = &app.contact_name {
        println!("Contact: {}", name);
    }
    if let Some(email) = &app.contact_email {
        println!("Contact email: {}", email);
    }
    if let Some(link) = &app.contact_linkedin {
        println!("Contact LinkedIn: {}", link);
    }
    if let Some(salary) = &app.salary_range {
        println!("Salary: {}", salary);
    }
    if let Some(reqs) = &app.key_requirements {
        println!("Key requirements: {}", reqs);
    }
    println!("Created: {}", app.created_at.format("%Y-%m-%d %H:%M"));
    println!("Updated: {}", app.updated_at.format("%Y-%m-%d %H:%M"));
    if let Some(notes) = &app.notes {
        println!("\n--- Notes ---\n{}", notes);
    }
}

fn follow_up_cell(app: &JobApplication, today: NaiveDate) -> String {
    let Some(due) = app.follow_up_due_date else {
        return "-".to_string();
    };
    match follow_up_urgency(due, today) {
        Urgency::Overdue if !app.status.is_settled() => format!("{} !", due),
        Urgency::DueSoon => format!("{} ~", due),
        _ => due.to_string(),
    }
}

fn short_id(app: &JobApplication) -> String {
    app.id.to_string()[..8].to_string()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
