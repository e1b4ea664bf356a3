//! Sheetanim CLI: turn sprite sheets into looping GIFs.
//!
//! Usage:
//!   sheetanim analyze <IMAGE>           Infer the grid of a sheet
//!   sheetanim slice <IMAGE> -o <DIR>    Cut a sheet into frame files
//!   sheetanim encode <DIR> -o <FILE>    Encode frame files into a GIF
//!   sheetanim convert <IMAGE> -o <FILE> Slice and encode in one step
//!   sheetanim reap                      Remove expired stored artifacts

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use sheetanim_common::config::{AppConfig, DetectionMode};

mod commands;

#[derive(Parser)]
#[command(
    name = "sheetanim",
    about = "Sprite sheet to animated GIF converter",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/sheetanim/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer the grid layout of a sprite sheet
    Analyze {
        /// Path to the sheet image
        image: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Keep the sheet in the artifact store for a later `convert --id`
        #[arg(long)]
        stash: bool,

        /// Detection strategies to try (defaults to the configured mode)
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },

    /// Cut a sprite sheet into numbered frame files
    Slice {
        /// Path to the sheet image
        image: PathBuf,

        /// Detect the grid; explicit values below override the detected ones
        #[arg(long)]
        auto: bool,

        /// Detection strategies to try with --auto
        #[arg(long, value_enum, requires = "auto")]
        mode: Option<Mode>,

        /// Number of rows
        #[arg(long, required_unless_present = "auto")]
        rows: Option<u32>,

        /// Number of columns
        #[arg(long, required_unless_present = "auto")]
        cols: Option<u32>,

        /// Pixels trimmed from each side of every cell
        #[arg(long)]
        margin: Option<i32>,

        /// Output directory for frame_001.png, frame_002.png, ...
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Encode a directory of frame files into a looping GIF
    Encode {
        /// Directory holding the frames (*.png, sorted by name)
        input: PathBuf,

        /// Display time of every frame in milliseconds
        #[arg(short, long)]
        duration: Option<u32>,

        /// Output GIF path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Slice and encode a sheet in one step
    Convert {
        /// Path to the sheet image
        #[arg(required_unless_present = "id", conflicts_with = "id")]
        image: Option<PathBuf>,

        /// Id of a sheet stored with `analyze --stash`
        #[arg(long)]
        id: Option<String>,

        /// Replace the detected row count
        #[arg(long)]
        rows: Option<u32>,

        /// Replace the detected column count
        #[arg(long)]
        cols: Option<u32>,

        /// Pixels trimmed from each side of every cell (defaults to the
        /// configured margin)
        #[arg(long)]
        margin: Option<i32>,

        /// Display time of every frame in milliseconds
        #[arg(short, long)]
        duration: Option<u32>,

        /// Detection strategies to try (defaults to the configured mode)
        #[arg(long, value_enum)]
        mode: Option<Mode>,

        /// Output GIF path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Remove stored artifacts older than the retention window
    Reap {
        /// Keep sweeping on the configured interval until Ctrl+C
        #[arg(long)]
        watch: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Every strategy; the most confident grid wins
    Auto,
    /// Separators darker than the cells
    DarkLines,
    /// Separators brighter than the cells
    LightLines,
    /// Periodic brightness steps, for sheets without separators
    Edges,
    /// Guess from the image size alone
    Guess,
}

impl From<Mode> for DetectionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Auto => DetectionMode::Auto,
            Mode::DarkLines => DetectionMode::DarkLines,
            Mode::LightLines => DetectionMode::LightLines,
            Mode::Edges => DetectionMode::Edges,
            Mode::Guess => DetectionMode::Guess,
        }
    }
}

impl Commands {
    fn mode(&self) -> Option<Mode> {
        match self {
            Self::Analyze { mode, .. } | Self::Slice { mode, .. } | Self::Convert { mode, .. } => {
                *mode
            }
            Self::Encode { .. } | Self::Reap { .. } => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?,
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if let Some(mode) = cli.command.mode() {
        config.analysis.mode = mode.into();
    }
    sheetanim_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Analyze {
            image, json, stash, ..
        } => commands::analyze::run(config, image, json, stash),
        Commands::Slice {
            image,
            auto,
            rows,
            cols,
            margin,
            output,
            ..
        } => commands::slice::run(&config, image, auto, rows, cols, margin, output),
        Commands::Encode {
            input,
            duration,
            output,
        } => commands::encode::run(&config, input, duration, output),
        Commands::Convert {
            image,
            id,
            rows,
            cols,
            margin,
            duration,
            output,
            ..
        } => commands::convert::run(config, image, id, rows, cols, margin, duration, output),
        Commands::Reap { watch } => commands::reap::run(config, watch).await,
    }
}
