//! Command-line interface.
//!
//! Options mirror the config file keys and override them.  The controller
//! flags (`--next`, `--prev`, `--stop`) turn the invocation into a one-shot
//! request to the running instance.

use crate::control::ControlRequest;
use crate::scan::Aspect;
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "bgcycle",
    version,
    about = "Rotate the desktop background through a shuffled set of images",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Args {
    /// Aspect ratio filter: landscape, portrait or any
    #[arg(short = 'a', long)]
    pub aspect: Option<Aspect>,

    /// Show different images on two screens
    #[arg(long)]
    pub dual: bool,

    /// Program to run; use with `--method cmd`
    #[arg(short = 'c', long)]
    pub cmd: Option<String>,

    /// Colon-separated list of directories to search
    #[arg(short = 'd', long, value_delimiter = ':')]
    pub dirs: Vec<PathBuf>,

    /// Stay in the foreground instead of detaching
    #[arg(short = 'f', long)]
    pub foreground: bool,

    /// Minimum image height
    #[arg(short = 'h', long)]
    pub height: Option<u32>,

    /// Minimum image width
    #[arg(short = 'w', long)]
    pub width: Option<u32>,

    /// Seconds between changes
    #[arg(short = 'i', long)]
    pub interval: Option<u64>,

    /// Maximum number of files to collect
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Background-setting method; `help` lists them
    #[arg(short = 'm', long)]
    pub method: Option<String>,

    /// Log level: off, error, warn, info, debug or trace
    #[arg(long)]
    pub log_level: Option<LevelFilter>,

    /// Config file (default: $XDG_CONFIG_HOME/bgcycle/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Lock file (default: ~/.bgcycle.pid)
    #[arg(long)]
    pub lock_file: Option<PathBuf>,

    /// Tell the running instance to show the next background
    #[arg(short = 'n', long, group = "control")]
    pub next: bool,

    /// Tell the running instance to show the previous background
    #[arg(short = 'p', long, group = "control")]
    pub prev: bool,

    /// Tell the running instance to stop
    #[arg(short = 's', long, group = "control")]
    pub stop: bool,

    /// Print help
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// Image files or directories, searched after `--dirs`
    pub paths: Vec<PathBuf>,
}

impl Args {
    /// The request to send if this is a controller invocation.
    pub fn control_request(&self) -> Option<ControlRequest> {
        if self.next {
            Some(ControlRequest::Advance)
        } else if self.prev {
            Some(ControlRequest::Retreat)
        } else if self.stop {
            Some(ControlRequest::Terminate)
        } else {
            None
        }
    }
}
