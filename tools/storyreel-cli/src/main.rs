//! StoryReel CLI: timeline generation, preview and editing from the command line.
//!
//! Usage:
//!   storyreel init <PROJECT>                  Create a new project
//!   storyreel info <PROJECT>                  Show project and timeline information
//!   storyreel generate <PROJECT>              Build a timeline from media and narration
//!   storyreel validate <PROJECT>              Render dry-run (writes dry_run_report.json)
//!   storyreel motion <PROJECT>                Print per-frame Ken Burns transforms
//!   storyreel preview <PROJECT>               Render preview frames to PNG
//!   storyreel reorder <PROJECT> <FROM> <TO>   Move a segment
//!   storyreel effect <PROJECT> <INDEX> <TAG>  Set a segment's encoder effect
//!   storyreel ken-burns <PROJECT> <INDEX>     Change a segment's preview motion

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use storyreel_common::{AppConfig, DurationPolicy};

mod commands;

use commands::preview::PreviewArgs;
use commands::Workspace;

#[derive(Parser)]
#[command(
    name = "storyreel",
    about = "Timeline preview and Ken Burns motion for narrated slideshows",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Projects directory (defaults to the configured one)
    #[arg(long, global = true)]
    projects_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Every segment gets the same share of the total
    Even,
    /// Segments keep their relative durations
    Preserve,
}

impl From<PolicyArg> for DurationPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Even => DurationPolicy::EvenSplit,
            PolicyArg::Preserve => DurationPolicy::PreserveAuthored,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Project identifier (directory name)
        project: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show project and timeline information
    Info {
        /// Project identifier
        project: String,
    },

    /// Generate a timeline from the project's media and narration
    Generate {
        /// Project identifier
        project: String,
    },

    /// Dry-run the render and write dry_run_report.json
    Validate {
        /// Project identifier
        project: String,

        /// Frame rate used for the frame estimate
        #[arg(long)]
        fps: Option<u32>,
    },

    /// Print the sampled Ken Burns transform of every frame
    Motion {
        /// Project identifier
        project: String,

        /// Sampling rate
        #[arg(long)]
        fps: Option<u32>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Render preview frames to PNG files
    Preview {
        /// Project identifier
        project: String,

        /// Output directory (defaults to <project>/preview)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Preview frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Surface width
        #[arg(long)]
        width: Option<u32>,

        /// Surface height
        #[arg(long)]
        height: Option<u32>,

        /// Write every Nth frame
        #[arg(long, default_value = "1")]
        every: u32,

        /// Playback time to start at (seconds)
        #[arg(long)]
        start: Option<f64>,

        /// Playback time to stop at (seconds)
        #[arg(long)]
        end: Option<f64>,

        /// Hide the diagnostic overlay
        #[arg(long)]
        no_overlay: bool,

        /// Play in real time and save only the last frame
        #[arg(long)]
        realtime: bool,
    },

    /// Move a segment to a new position and save
    Reorder {
        /// Project identifier
        project: String,

        /// Zero-based index of the segment to move
        from: usize,

        /// Zero-based destination index
        to: usize,

        /// How durations are re-derived (defaults to the configured policy)
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
    },

    /// Set a segment's encoder effect and save
    Effect {
        /// Project identifier
        project: String,

        /// Zero-based segment index
        index: usize,

        /// Effect tag: zoom_in|zoom_out|pan_left|pan_right|none
        effect: String,
    },

    /// Change a segment's Ken Burns motion and save
    KenBurns {
        /// Project identifier
        project: String,

        /// Zero-based segment index
        index: usize,

        /// Preset: subtle|zoom_in|zoom_out|pan_left_right|pan_bottom_top
        #[arg(long)]
        preset: Option<String>,

        /// Turn motion on
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Turn motion off
        #[arg(long)]
        disable: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    storyreel_common::logging::init_logging(&logging);

    let workspace = Workspace::new(config, cli.projects_dir);

    match cli.command {
        Commands::Init { project, name } => commands::init::run(&workspace, project, name),
        Commands::Info { project } => commands::info::run(&workspace, project).await,
        Commands::Generate { project } => commands::generate::run(&workspace, project).await,
        Commands::Validate { project, fps } => {
            commands::validate::run(&workspace, project, fps).await
        }
        Commands::Motion { project, fps, json } => {
            commands::motion::run(&workspace, project, fps, json).await
        }
        Commands::Preview {
            project,
            output,
            fps,
            width,
            height,
            every,
            start,
            end,
            no_overlay,
            realtime,
        } => {
            let args = PreviewArgs {
                output,
                fps,
                width,
                height,
                every,
                start,
                end,
                overlay: !no_overlay,
                realtime,
            };
            commands::preview::run(&workspace, project, args).await
        }
        Commands::Reorder {
            project,
            from,
            to,
            policy,
        } => commands::edit::reorder(&workspace, project, from, to, policy.map(Into::into)).await,
        Commands::Effect {
            project,
            index,
            effect,
        } => commands::edit::effect(&workspace, project, index, effect).await,
        Commands::KenBurns {
            project,
            index,
            preset,
            enable,
            disable,
        } => {
            let enabled = match (enable, disable) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            commands::edit::ken_burns(&workspace, project, index, preset, enabled).await
        }
    }
}
