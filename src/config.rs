//! Application configuration.
//!
//! The configuration is loaded from a JSON file
//! (`$XDG_CONFIG_HOME/bgcycle/config.json` unless `--config` names another)
//! and then overridden by command-line options.  Every key is optional; a
//! minimal `{}` file is valid.
//!
//! # Example
//!
//! ```json
//! {
//!   "dirs": ["~/Pictures/backgrounds", "/usr/share/backgrounds"],
//!   "method": "xfce4",
//!   "interval": 300,
//!   "dual": true,
//!   "aspect": "landscape",
//!   "min_width": 1600
//! }
//! ```
//!
//! [`Config::resolve`] validates the merged result into [`Settings`].

use crate::applier::{self, cmd, DEFAULT_METHOD};
use crate::cli::Args;
use crate::lock::InstanceLock;
use crate::pool::DisplayMode;
use crate::scan::{Aspect, Filter, DEFAULT_MAX_FILES};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Seconds between changes unless configured otherwise.
pub const DEFAULT_INTERVAL: u64 = 120;

/// Top-level configuration, as read from the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Files and directories to collect images from.
    pub dirs: Vec<PathBuf>,
    /// Name of the background-setting method.
    pub method: String,
    /// Program for the `cmd` method.
    pub cmd: Option<String>,
    /// Seconds between automatic changes.
    pub interval: u64,
    /// Show two images at once.
    pub dual: bool,
    pub aspect: Aspect,
    pub min_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_files: usize,
    /// Do not detach from the terminal.
    pub foreground: bool,
    /// Override the lock file location.
    pub lock_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            method: DEFAULT_METHOD.into(),
            cmd: None,
            interval: DEFAULT_INTERVAL,
            dual: false,
            aspect: Aspect::Any,
            min_width: None,
            min_height: None,
            max_files: DEFAULT_MAX_FILES,
            foreground: false,
            lock_file: None,
        }
    }
}

/// Errors from loading or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("interval must be at least 1 second")]
    Interval,
    #[error("unknown method '{0}'; '--method help' for a list")]
    UnknownMethod(String),
    #[error("'--method cmd' requires '--cmd <program>'")]
    MissingCommand,
}

/// The validated configuration the program runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub roots: Vec<PathBuf>,
    pub method: String,
    pub cmd: Option<String>,
    /// Seconds between automatic changes, at least 1.
    pub interval: u32,
    pub mode: DisplayMode,
    pub filter: Filter,
    pub foreground: bool,
    pub lock_path: PathBuf,
}

/// `$XDG_CONFIG_HOME/bgcycle/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("bgcycle")
        .join("config.json")
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Expand `~` and anchor relative paths at the current directory, so paths
/// stay valid after detaching (which changes to `/`).
fn absolute(path: &Path) -> PathBuf {
    let expanded = expand_tilde(path);
    std::path::absolute(&expanded).unwrap_or(expanded)
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Lock file location: configured, or `~/.bgcycle.pid`.
    pub fn lock_path(&self) -> PathBuf {
        self.lock_file
            .as_deref()
            .map(absolute)
            .unwrap_or_else(InstanceLock::default_path)
    }

    /// Apply command-line overrides.
    ///
    /// Directories given with `--dirs` or as positional paths replace the
    /// configured list, `--dirs` entries first.
    pub fn merge_args(&mut self, args: &Args) {
        let paths: Vec<PathBuf> = args.dirs.iter().chain(&args.paths).cloned().collect();
        if !paths.is_empty() {
            self.dirs = paths;
        }
        if let Some(method) = &args.method {
            self.method = method.clone();
        }
        if let Some(cmd) = &args.cmd {
            self.cmd = Some(cmd.clone());
        }
        if let Some(interval) = args.interval {
            self.interval = interval;
        }
        if let Some(aspect) = args.aspect {
            self.aspect = aspect;
        }
        if let Some(w) = args.width {
            self.min_width = Some(w);
        }
        if let Some(h) = args.height {
            self.min_height = Some(h);
        }
        if let Some(max) = args.max_files {
            self.max_files = max;
        }
        if let Some(lock) = &args.lock_file {
            self.lock_file = Some(lock.clone());
        }
        self.dual |= args.dual;
        self.foreground |= args.foreground;
    }

    /// Validate into [`Settings`].
    ///
    /// Combining dual mode with a method that shows one image is allowed
    /// but warned about; such methods apply the first image only.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::Interval);
        }
        if !applier::is_known_method(&self.method) {
            return Err(ConfigError::UnknownMethod(self.method.clone()));
        }
        if self.method == cmd::NAME && self.cmd.is_none() {
            return Err(ConfigError::MissingCommand);
        }
        if self.dual && !applier::method_supports_dual(&self.method) {
            warn!(
                "dual-monitor mode is not compatible with method '{}', showing one image",
                self.method
            );
        }

        Ok(Settings {
            roots: self.dirs.iter().map(|d| absolute(d)).collect(),
            method: self.method.clone(),
            cmd: self.cmd.clone(),
            interval: u32::try_from(self.interval).unwrap_or(u32::MAX),
            mode: DisplayMode::from_dual(self.dual),
            filter: Filter {
                min_width: self.min_width,
                min_height: self.min_height,
                aspect: self.aspect,
                max_files: self.max_files,
            },
            foreground: self.foreground,
            lock_path: self.lock_path(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn deserialize_full_config() {
        let json = r#"{
            "dirs": ["/pics", "/more"],
            "method": "cmd",
            "cmd": "/usr/local/bin/setbg",
            "interval": 30,
            "dual": true,
            "aspect": "portrait",
            "min_width": 800,
            "min_height": 600,
            "max_files": 50,
            "foreground": true,
            "lock_file": "/run/user/1000/bgcycle.pid"
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.dirs, vec![PathBuf::from("/pics"), PathBuf::from("/more")]);
        assert_eq!(cfg.method, "cmd");
        assert_eq!(cfg.cmd.as_deref(), Some("/usr/local/bin/setbg"));
        assert_eq!(cfg.interval, 30);
        assert!(cfg.dual);
        assert_eq!(cfg.aspect, Aspect::Portrait);
        assert_eq!(cfg.min_width, Some(800));
        assert_eq!(cfg.min_height, Some(600));
        assert_eq!(cfg.max_files, 50);
        assert!(cfg.foreground);
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.method, "gnome-shell");
        assert_eq!(cfg.interval, 120);
        assert_eq!(cfg.max_files, 1000);
    }

    #[test]
    fn unknown_top_level_keys_ignored() {
        let json = r#"{ "interval": 5, "future_section": { "key": 42 } }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.interval, 5);
    }

    #[test]
    fn command_line_overrides_file() {
        let mut cfg: Config =
            serde_json::from_str(r#"{ "dirs": ["/pics"], "interval": 60, "method": "kde" }"#)
                .unwrap();
        let args = Args::try_parse_from(["bgcycle", "-i", "10", "--dual", "/other"]).unwrap();
        cfg.merge_args(&args);
        assert_eq!(cfg.dirs, vec![PathBuf::from("/other")]);
        assert_eq!(cfg.interval, 10);
        assert_eq!(cfg.method, "kde");
        assert!(cfg.dual);
    }

    #[test]
    fn resolve_builds_settings() {
        let cfg = Config {
            dirs: vec![PathBuf::from("/pics")],
            dual: true,
            method: "xfce4".into(),
            lock_file: Some(PathBuf::from("/tmp/x.pid")),
            ..Config::default()
        };
        let s = cfg.resolve().unwrap();
        assert_eq!(s.roots, vec![PathBuf::from("/pics")]);
        assert_eq!(s.mode, DisplayMode::Dual);
        assert_eq!(s.interval, 120);
        assert_eq!(s.lock_path, PathBuf::from("/tmp/x.pid"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let cfg = Config {
            interval: 0,
            ..Config::default()
        };
        assert!(matches!(cfg.resolve(), Err(ConfigError::Interval)));
    }

    #[test]
    fn unknown_method_is_rejected() {
        let cfg = Config {
            method: "fvwm".into(),
            ..Config::default()
        };
        assert!(matches!(cfg.resolve(), Err(ConfigError::UnknownMethod(m)) if m == "fvwm"));
    }

    #[test]
    fn cmd_method_needs_a_command() {
        let mut cfg = Config {
            method: "cmd".into(),
            ..Config::default()
        };
        assert!(matches!(cfg.resolve(), Err(ConfigError::MissingCommand)));
        cfg.cmd = Some("setbg".into());
        assert!(cfg.resolve().is_ok());
    }

    #[test]
    fn dual_with_single_image_method_is_allowed() {
        let cfg = Config {
            dual: true,
            ..Config::default()
        };
        assert_eq!(cfg.resolve().unwrap().mode, DisplayMode::Dual);
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/pics")), home.join("pics"));
        }
        assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn relative_dirs_become_absolute() {
        let cfg = Config {
            dirs: vec![PathBuf::from("pics")],
            ..Config::default()
        };
        let roots = cfg.resolve().unwrap().roots;
        assert!(roots[0].is_absolute());
        assert!(roots[0].ends_with("pics"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(Path::new("/nonexistent/bgcycle/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
