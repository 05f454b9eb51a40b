//! Command line entry point for Lumeer perspectives.
//!
//! # Responsibility
//! - Run the Kanban and Gantt converters over JSON files.
//! - Manage saved views in a SQLite database and render them.
//! - Print results as pretty JSON on stdout; logs go to stderr or files.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use lumeer_core::{
    GanttChartConfig, GanttChartConverter, KanbanConfig, KanbanConverter, Perspective,
    PerspectiveConfig, PerspectiveInput, PerspectiveService, SqliteViewRepository,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Lumeer perspective converters
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Write rotating log files to this absolute directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print core health and version
    Ping,
    /// Convert records into Kanban columns
    Kanban(ConvertArgs),
    /// Convert records into Gantt chart tasks
    Gantt {
        #[command(flatten)]
        args: ConvertArgs,
        /// Treat the input as the complete data set
        #[arg(long)]
        data_loaded: bool,
        /// Locale forwarded to chart options
        #[arg(long, default_value = "en")]
        locale: String,
    },
    /// Manage saved views
    Views {
        #[command(subcommand)]
        command: ViewsCommand,
    },
    /// Render a saved view
    Render {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        view: Uuid,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        data_loaded: bool,
        #[arg(long, default_value = "en")]
        locale: String,
    },
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Path to the view config JSON
    #[arg(long)]
    config: PathBuf,
    /// Path to the perspective input JSON
    #[arg(long)]
    input: PathBuf,
}

#[derive(Subcommand, Debug)]
enum ViewsCommand {
    /// List saved views
    List {
        #[arg(long)]
        db: PathBuf,
        #[arg(long, value_enum)]
        perspective: Option<PerspectiveArg>,
    },
    /// Save a view from a config file
    Create {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long, value_enum)]
        perspective: PerspectiveArg,
        #[arg(long)]
        config: PathBuf,
    },
    /// Delete a saved view
    Delete {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        view: Uuid,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PerspectiveArg {
    Kanban,
    Gantt,
}

impl From<PerspectiveArg> for Perspective {
    fn from(value: PerspectiveArg) -> Self {
        match value {
            PerspectiveArg::Kanban => Perspective::Kanban,
            PerspectiveArg::Gantt => Perspective::GanttChart,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    match cli.command {
        Command::Ping => {
            println!("lumeer_core ping={}", lumeer_core::ping());
            println!("lumeer_core version={}", lumeer_core::core_version());
        }
        Command::Kanban(args) => {
            let config: KanbanConfig = read_json(&args.config)?;
            let input: PerspectiveInput = read_json(&args.input)?;
            let conversion = KanbanConverter::new().convert(&config, &input);
            print_json(&conversion)?;
        }
        Command::Gantt {
            args,
            data_loaded,
            locale,
        } => {
            let config: GanttChartConfig = read_json(&args.config)?;
            let input: PerspectiveInput = read_json(&args.input)?;
            let conversion = GanttChartConverter::new(locale).convert(&config, &input, data_loaded);
            print_json(&conversion)?;
        }
        Command::Views { command } => run_views(command)?,
        Command::Render {
            db,
            view,
            input,
            data_loaded,
            locale,
        } => {
            let conn = lumeer_core::open_db(&db)
                .with_context(|| format!("failed to open database `{}`", db.display()))?;
            let input: PerspectiveInput = read_json(&input)?;
            let mut service = PerspectiveService::new(SqliteViewRepository::new(&conn), locale);
            match service.get_view(view)?.perspective() {
                Perspective::Kanban => print_json(&service.render_kanban(view, &input)?)?,
                Perspective::GanttChart => {
                    print_json(&service.render_gantt(view, &input, data_loaded)?)?
                }
            }
        }
    }

    Ok(())
}

fn run_views(command: ViewsCommand) -> Result<()> {
    match command {
        ViewsCommand::List { db, perspective } => {
            let conn = lumeer_core::open_db(&db)
                .with_context(|| format!("failed to open database `{}`", db.display()))?;
            let service = PerspectiveService::new(SqliteViewRepository::new(&conn), "en");
            let views = service.list_views(perspective.map(Perspective::from))?;
            print_json(&views)?;
        }
        ViewsCommand::Create {
            db,
            name,
            perspective,
            config,
        } => {
            let config = match Perspective::from(perspective) {
                Perspective::Kanban => PerspectiveConfig::Kanban(read_json(&config)?),
                Perspective::GanttChart => PerspectiveConfig::GanttChart(read_json(&config)?),
            };
            let conn = lumeer_core::open_db(&db)
                .with_context(|| format!("failed to open database `{}`", db.display()))?;
            let service = PerspectiveService::new(SqliteViewRepository::new(&conn), "en");
            let id = service.create_view(name, config)?;
            info!("event=cli_view_create module=cli status=ok");
            println!("{id}");
        }
        ViewsCommand::Delete { db, view } => {
            let conn = lumeer_core::open_db(&db)
                .with_context(|| format!("failed to open database `{}`", db.display()))?;
            let mut service = PerspectiveService::new(SqliteViewRepository::new(&conn), "en");
            service.delete_view(view)?;
        }
    }
    Ok(())
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = cli
        .log_level
        .as_deref()
        .unwrap_or_else(|| lumeer_core::default_log_level());

    let result = match &cli.log_dir {
        Some(dir) => {
            let Some(dir) = dir.to_str() else {
                bail!("log directory `{}` is not valid UTF-8", dir.display());
            };
            lumeer_core::init_logging(level, dir)
        }
        None => lumeer_core::init_stderr_logging(level),
    };
    result.map_err(anyhow::Error::msg)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read `{}`", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in `{}`", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
