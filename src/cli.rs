use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::resolver::TEXT_MIME;

/// Turn tracking-site links into configured Read nodes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging to file (default: versiondropper.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE", global = true)]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Settings file (default: versiondropper.json in the config directory)
    #[arg(short = 's', long = "settings", value_name = "FILE", global = true)]
    pub settings: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate a drop and print the nodes it creates as JSON
    Drop {
        /// Dropped text, e.g. a detail page URL
        #[arg(value_name = "TEXT")]
        text: String,

        /// JSON file with records keyed by entity type
        #[arg(short = 'r', long = "records", value_name = "JSON")]
        records: PathBuf,

        /// MIME kind of the drop
        #[arg(short = 'm', long = "mime", default_value = TEXT_MIME)]
        mime: String,
    },

    /// List frame sequences in a directory
    Scan {
        /// Directory to scan (not recursive)
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Only open sequences with these extensions (repeatable)
        #[arg(short = 'e', long = "ext", value_name = "EXT")]
        extensions: Vec<String>,

        /// Frame placeholder for templates (default: %0Nd from the files)
        #[arg(long = "frame-spec", value_name = "SPEC")]
        frame_spec: Option<String>,
    },
}
