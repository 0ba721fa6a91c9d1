//! Command line interface definition

use clap::{Parser, Subcommand, ValueEnum};
use keg_config::ColorChoice;
use std::path::PathBuf;

/// keg - post-install cleaner for keg packages
#[derive(Parser)]
#[command(name = "keg")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Post-install cleaner for keg packages")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Log every event at debug level to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Print every action the cleaner takes
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorArg>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ColorArg {
    Always,
    Auto,
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Always => ColorChoice::Always,
            ColorArg::Auto => ColorChoice::Auto,
            ColorArg::Never => ColorChoice::Never,
        }
    }
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Normalise an installed package prefix
    Clean {
        /// Package prefix; relative paths that do not exist are looked up in the cellar
        prefix: PathBuf,

        /// Package name (defaults to the prefix's parent directory name)
        #[arg(long)]
        name: Option<String>,

        /// Prefix-relative path to leave untouched (repeatable)
        #[arg(long = "skip", value_name = "REL")]
        skip: Vec<PathBuf>,

        /// Leave the whole prefix untouched
        #[arg(long)]
        skip_all: bool,

        /// Keep share/info
        #[arg(long)]
        keep_info: bool,
    },

    /// Show the detected platform and its tools
    Platform,
}
