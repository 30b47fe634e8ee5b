use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(version, about = "Kanban board client with optimistic sync")]
pub struct Cli {
    /// Path to the config file (defaults to <config dir>/taskboard/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Base URL of the board service. Overrides config and environment.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Acting user name. Overrides config and environment.
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List active projects with task counts
    Projects,
    /// Show a project's columns and tasks
    Board { project: String },
    /// Create a project
    NewProject {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Archive a project
    Archive { project: String },
    /// Append a column to a project
    AddColumn {
        project: String,
        /// Title to give the new column
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Add a task to a column
    AddTask {
        project: String,
        column: String,
        content: String,
        #[arg(short, long)]
        description: Option<String>,
        /// low, medium or high
        #[arg(short, long, default_value = "medium")]
        priority: String,
        /// Defaults to the acting user
        #[arg(short, long)]
        assignee: Option<String>,
        /// Tag name (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Checklist item (repeatable)
        #[arg(long = "check")]
        checklist: Vec<String>,
        /// Start date, YYYY-MM-DD
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Move a task within or across columns
    MoveTask {
        project: String,
        task: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Task to drop onto; the task takes its slot. Omit to append.
        #[arg(long)]
        over: Option<String>,
    },
    /// Show per-project task counts
    Counts,
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    taskboard::logging::init(cli.verbose, cli.log_json);
    let config = cmd::resolve_config(&cli)?;

    match &cli.command {
        Commands::Projects => cmd::cmd_projects(&config).await?,
        Commands::Board { project } => cmd::cmd_board(&config, project).await?,
        Commands::NewProject { title, description } => {
            cmd::cmd_new_project(&config, title, description).await?
        }
        Commands::Archive { project } => cmd::cmd_archive(&config, project).await?,
        Commands::AddColumn { project, title } => {
            cmd::cmd_add_column(&config, project, title.as_deref()).await?
        }
        Commands::AddTask {
            project,
            column,
            content,
            description,
            priority,
            assignee,
            tags,
            checklist,
            start,
            due,
        } => {
            let args = cmd::AddTaskArgs {
                column,
                content,
                description: description.as_deref(),
                priority,
                assignee: assignee.as_deref(),
                tags,
                checklist,
                start: *start,
                due: *due,
            };
            cmd::cmd_add_task(&config, project, args).await?
        }
        Commands::MoveTask {
            project,
            task,
            from,
            to,
            over,
        } => cmd::cmd_move_task(&config, project, task, from, to, over.as_deref()).await?,
        Commands::Counts => cmd::cmd_counts(&config).await?,
        Commands::Config => cmd::cmd_config(&config, cli.config.as_deref())?,
    }

    Ok(())
}
