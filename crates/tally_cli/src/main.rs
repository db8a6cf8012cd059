//! Command-line front end for the tally core.
//!
//! # Responsibility
//! - Load class configuration and open the local store.
//! - Ingest exported platform events and print reports from the cache.
//!
//! # See also
//! - `tally_core::IngestService` for how raw events become submissions.

use clap::{Parser, Subcommand};
use log::info;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tally_core::db::Connection;
use tally_core::{
    aggregate, daily_report, init_logging, personal_report, render_daily_report,
    render_personal_report, render_roster_csv, roster_report, ClassConfig, ClassRegistry,
    IngestService, NoUserSource, RawEvent, SqliteEventRepository, SqliteUserRepository,
    UserId, UserRecord,
};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "tally", about = "Participation credit for labeled class posts")]
#[command(version, propagate_version = true)]
struct Cli {
    /// Class configuration file (TOML, `[[class]]` entries)
    #[arg(long, default_value = "classes.toml")]
    config: PathBuf,

    /// SQLite cache file
    #[arg(long, default_value = "tally.sqlite3")]
    db: PathBuf,

    /// Stream specifier of the class to operate on
    #[arg(long = "class")]
    class: String,

    /// Absolute directory for rotating log files; logging is off when unset
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log level used with --log-dir
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve exported events and merge them into the cache
    Ingest {
        /// JSON array of raw platform events
        #[arg(long)]
        events: PathBuf,
        /// JSON array of user records for senders and reactors
        #[arg(long)]
        users: PathBuf,
    },
    /// Credit summary for one student
    Personal {
        #[arg(long)]
        user: UserId,
    },
    /// CSV roster of every student with submissions
    Roster,
    /// Cached students whose name contains the given text
    Find { name: String },
    /// Every submission for one label
    Daily { label: String },
    /// Show the label and deadline found in a topic or message
    Check { text: String },
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if let Some(log_dir) = &cli.log_dir {
        let level = cli
            .log_level
            .as_deref()
            .unwrap_or_else(|| tally_core::default_log_level());
        init_logging(level, log_dir)?;
    }
    info!(
        "event=cli_start module=cli status=ok cli_version={} core_version={}",
        env!("CARGO_PKG_VERSION"),
        tally_core::core_version()
    );

    let registry = ClassRegistry::load(&cli.config)?;
    let class = registry
        .by_specifier(&cli.class)
        .ok_or_else(|| format!("no class with specifier `{}`", cli.class))?;
    let conn = tally_core::db::open_db(&cli.db)?;

    match cli.command {
        Commands::Ingest { events, users } => ingest(&conn, class, &events, &users),
        Commands::Personal { user } => {
            let events = SqliteEventRepository::new(&conn, class.stream_specifier.as_str())
                .list_events()?;
            let report = personal_report(&aggregate(&events)?, user);
            println!("{}", render_personal_report(&report));
            Ok(())
        }
        Commands::Roster => {
            let events = SqliteEventRepository::new(&conn, class.stream_specifier.as_str())
                .list_events()?;
            let users = SqliteUserRepository::new(&conn, NoUserSource);
            let rows = roster_report(&aggregate(&events)?, &users)?;
            print!("{}", render_roster_csv(&rows));
            Ok(())
        }
        Commands::Find { name } => {
            let users = SqliteUserRepository::new(&conn, NoUserSource);
            for user in users.find_members_by_name(&name)? {
                println!("{}\t{}\t{}", user.user_id, user.full_name, user.delivery_email);
            }
            Ok(())
        }
        Commands::Daily { label } => {
            let resolver = class.build_resolver()?;
            let label = resolver
                .resolve(label.trim())
                .ok_or_else(|| format!("`{label}` is not a label of class `{}`", cli.class))?;
            let events = SqliteEventRepository::new(&conn, class.stream_specifier.as_str())
                .list_events()?;
            let entries = daily_report(&events, label.as_str());
            println!("{}", render_daily_report(label.as_str(), &entries));
            Ok(())
        }
        Commands::Check { text } => {
            let resolver = class.build_resolver()?;
            match resolver
                .extract_from_topic(&text)
                .or_else(|| resolver.extract_from_message(&text))
            {
                Some(label) => {
                    let deadline = resolver.deadline_of(&label)?;
                    println!("{label} due {}", deadline.to_rfc3339());
                }
                None => println!("no label"),
            }
            Ok(())
        }
    }
}

fn ingest(
    conn: &Connection,
    class: &ClassConfig,
    events_path: &Path,
    users_path: &Path,
) -> CliResult<()> {
    let batch: Vec<RawEvent> = read_json(events_path)?;
    let directory: BTreeMap<UserId, UserRecord> = read_json::<Vec<UserRecord>>(users_path)?
        .into_iter()
        .map(|user| (user.user_id, user))
        .collect();

    let resolver = class.build_resolver()?;
    let users = SqliteUserRepository::new(conn, directory);
    let service = IngestService::new(resolver.as_ref(), &users, class.invalid_emoji.as_str());
    let outcome = service.ingest_batch(&batch)?;

    let repo = SqliteEventRepository::new(conn, class.stream_specifier.as_str());
    let written = repo.upsert_events(&outcome.events)?;
    info!(
        "event=cli_ingest module=cli status=ok stream={} written={written} dropped={}",
        repo.stream(),
        outcome.dropped
    );
    println!(
        "ingested {written} submissions ({} dropped), {} cached for {}",
        outcome.dropped,
        repo.count()?,
        class.stream_name
    );
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read `{}`: {err}", path.display()))?;
    Ok(serde_json::from_str(&text)?)
}
