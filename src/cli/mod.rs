//! Command-line interface.
//!
//! Every editing command opens a [`Session`] over the configured store,
//! unlocks admin mode with `--admin-password`, applies one mutation and
//! saves. `serve` runs the HTTP API instead.

mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};

use crate::config::{ServerConfig, TrackerConfig};
use crate::config::tracker::validate_remote_url;
use crate::db::connect_from_config;
use crate::persistence::{LocalSnapshot, ProjectPersistence, RemoteProject};
use crate::settings::Settings;
use crate::tracker::media::PhotoFile;
use crate::tracker::session::Session;
use crate::web::{ApiState, start_server};

pub use render::{progress_bar, render_logs, render_project};

/// Construction progress tracker.
#[derive(Debug, Parser)]
#[command(name = "buildtrack", version)]
#[command(about = "Track construction phases, photo evidence and payment milestones")]
pub struct Cli {
    /// Edit the project behind this API server instead of the local snapshot
    #[arg(long, global = true, conflicts_with = "local")]
    pub remote: Option<String>,

    /// Local snapshot file to edit
    #[arg(long, global = true)]
    pub local: Option<PathBuf>,

    /// Settings file (defaults to ~/.buildtrack/settings.toml)
    #[arg(long, global = true, env = "BUILDTRACK_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Password that unlocks admin mode for editing commands
    #[arg(long, global = true)]
    pub admin_password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the project API server
    Serve(ServeArgs),

    /// Print phases, tasks and payment figures
    Show(ShowArgs),

    /// Print the most recent activity log entries
    Logs(LogsArgs),

    /// Task status changes
    #[command(subcommand)]
    Task(TaskCommand),

    /// Photo evidence on tasks
    #[command(subcommand)]
    Photo(PhotoCommand),

    /// Phase schedule changes
    #[command(subcommand)]
    Phase(PhaseCommand),

    /// Payment ledger entries
    #[command(subcommand)]
    Payment(PaymentCommand),

    /// Project-level settings
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Activity log maintenance
    #[command(subcommand)]
    Log(LogCommand),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Override the bind host
    #[arg(long)]
    pub host: Option<std::net::IpAddr>,

    /// Override the bind port
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Print the raw project document as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Maximum number of entries to print
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Mark a task completed, or reopen a completed one
    Toggle { task_id: u64 },
}

#[derive(Debug, Subcommand)]
pub enum PhotoCommand {
    /// Attach image files to a task
    Add {
        task_id: u64,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove a photo from a task
    Delete { task_id: u64, photo_id: String },
    /// Set the comment on a photo
    Comment {
        task_id: u64,
        photo_id: String,
        comment: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum PhaseCommand {
    /// Change a phase delivery date (DD/MM/YYYY)
    Date { phase_id: u64, date: String },
}

#[derive(Debug, Subcommand)]
pub enum PaymentCommand {
    /// Record a payment against a milestone
    Record {
        milestone_id: u64,
        /// Amount, with ',' or '.' as decimal separator
        amount: String,
        /// Receipt image to attach
        #[arg(long)]
        receipt: Option<PathBuf>,
        /// Free-text note
        #[arg(long)]
        comments: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// Rename the project
    Rename { name: String },
    /// Set the photo folder path shown to viewers
    DrivePath { path: String },
}

#[derive(Debug, Subcommand)]
pub enum LogCommand {
    /// Delete one activity log entry
    Delete { log_id: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let settings = match &self.settings {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load()?,
        };

        if let Command::Serve(args) = &self.command {
            return serve(&settings, args).await;
        }

        let tracker = TrackerConfig::from_settings(&settings)?;
        let persistence = self.persistence(&tracker)?;
        let mut session = Session::open(persistence, &tracker).await;

        match self.command {
            Command::Show(args) => {
                warn_banner(&session);
                if args.json {
                    println!("{}", serde_json::to_string_pretty(session.project())?);
                } else {
                    print!("{}", render_project(session.project()));
                }
                Ok(())
            }
            Command::Logs(args) => {
                warn_banner(&session);
                print!("{}", render_logs(&session.project().logs, args.limit));
                Ok(())
            }
            command => {
                if let Some(banner) = session.banner() {
                    bail!("{banner}");
                }
                let password = self
                    .admin_password
                    .as_deref()
                    .context("editing requires --admin-password")?;
                session.unlock_admin(password)?;

                let changed = apply(&mut session, command).await?;
                if changed {
                    session.save().await?;
                    if let Some(entry) = session.project().logs.first() {
                        println!("{}", entry.message);
                    } else {
                        println!("Saved.");
                    }
                } else {
                    println!("Nothing changed.");
                }
                Ok(())
            }
        }
    }

    fn persistence(&self, tracker: &TrackerConfig) -> anyhow::Result<Box<dyn ProjectPersistence>> {
        if let Some(raw) = &self.remote {
            return Ok(Box::new(RemoteProject::new(validate_remote_url(raw)?)?));
        }
        if let Some(path) = &self.local {
            return Ok(Box::new(LocalSnapshot::new(path.clone())));
        }
        match &tracker.remote_url {
            Some(url) => Ok(Box::new(RemoteProject::new(url.clone())?)),
            None => Ok(Box::new(LocalSnapshot::new(tracker.snapshot_path.clone()))),
        }
    }
}

fn warn_banner(session: &Session) {
    if let Some(banner) = session.banner() {
        eprintln!("warning: {banner}");
    }
}

async fn apply(session: &mut Session, command: Command) -> anyhow::Result<bool> {
    let changed = match command {
        Command::Task(TaskCommand::Toggle { task_id }) => session.toggle_task(task_id)?,
        Command::Photo(PhotoCommand::Add { task_id, files }) => {
            let mut photos = Vec::with_capacity(files.len());
            for path in &files {
                photos.push(PhotoFile::from_path(path).await?);
            }
            session.upload_photos(task_id, photos).await?
        }
        Command::Photo(PhotoCommand::Delete { task_id, photo_id }) => {
            session.delete_photo(task_id, &photo_id).await?
        }
        Command::Photo(PhotoCommand::Comment {
            task_id,
            photo_id,
            comment,
        }) => session.update_photo_comment(task_id, &photo_id, &comment)?,
        Command::Phase(PhaseCommand::Date { phase_id, date }) => {
            session.update_phase_date(phase_id, &date)?
        }
        Command::Payment(PaymentCommand::Record {
            milestone_id,
            amount,
            receipt,
            comments,
        }) => {
            let receipt = match receipt {
                Some(path) => Some(PhotoFile::from_path(&path).await?),
                None => None,
            };
            session
                .record_payment(milestone_id, &amount, receipt, comments)
                .await?
        }
        Command::Project(ProjectCommand::Rename { name }) => session.rename_project(&name)?,
        Command::Project(ProjectCommand::DrivePath { path }) => {
            session.set_drive_folder_path(&path)?
        }
        Command::Log(LogCommand::Delete { log_id }) => session.delete_log_entry(&log_id)?,
        Command::Serve(_) | Command::Show(_) | Command::Logs(_) => false,
    };
    Ok(changed)
}

async fn serve(settings: &Settings, args: &ServeArgs) -> anyhow::Result<()> {
    let mut config = ServerConfig::resolve(settings)?;
    if let Some(host) = args.host {
        config.gateway.host = host;
    }
    if let Some(port) = args.port {
        config.gateway.port = port;
    }

    tracing::info!("Using {} storage", config.database.backend.as_str());
    let store = connect_from_config(&config.database)
        .await
        .context("failed to open project storage")?;
    let state = ApiState::new(store);
    let addr = start_server(config.gateway.bind_addr(), Arc::clone(&state), &config.gateway).await?;
    println!("Serving project API on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    state.shutdown().await;
    Ok(())
}
