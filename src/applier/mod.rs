//! Desktop background methods.
//!
//! Each method is a [`BackgroundApplier`] that shells out to the desktop
//! environment's own tooling.  Methods are collected in a
//! [`MethodRegistry`] keyed by their stable name; adding a method means
//! registering another implementation.

pub mod cmd;
pub mod gnome;
pub mod kde;
pub mod xfce;
pub mod xview;

use crate::traits::BackgroundApplier;
use log::debug;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Method used when none is configured.
pub const DEFAULT_METHOD: &str = "gnome-shell";

/// Errors produced while setting the background.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// `apply` was called without any image.
    #[error("no image to apply")]
    NoImage,
    /// The desktop tooling needs a UTF-8 path.
    #[error("path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
    /// The external program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The external program ran but reported failure.
    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },
}

/// Name-keyed collection of background methods.
///
/// Iteration follows registration order, which is also the order
/// `--method help` prints.
#[derive(Default)]
pub struct MethodRegistry {
    methods: Vec<Box<dyn BackgroundApplier>>,
}

impl MethodRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in methods.
    ///
    /// The `cmd` method is only available when a user command is given.
    pub fn with_defaults(user_cmd: Option<&str>) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(xview::Xview));
        registry.register(Box::new(gnome::Gnome2));
        registry.register(Box::new(gnome::GnomeShell));
        registry.register(Box::new(xfce::Xfce4));
        registry.register(Box::new(kde::Kde));
        if let Some(program) = user_cmd {
            registry.register(Box::new(cmd::UserCommand::new(program)));
        }
        registry
    }

    /// Add a method, replacing any existing method with the same name.
    pub fn register(&mut self, method: Box<dyn BackgroundApplier>) {
        self.methods.retain(|m| m.name() != method.name());
        self.methods.push(method);
    }

    /// Look up a method by name.
    pub fn get(&self, name: &str) -> Option<&dyn BackgroundApplier> {
        self.methods
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    /// Names of every registered method.
    pub fn names(&self) -> Vec<&'static str> {
        self.methods.iter().map(|m| m.name()).collect()
    }

    /// Iterate over the registered methods.
    pub fn iter(&self) -> impl Iterator<Item = &dyn BackgroundApplier> {
        self.methods.iter().map(|m| m.as_ref())
    }
}

/// Whether `name` is a built-in method name, including `cmd`.
pub fn is_known_method(name: &str) -> bool {
    name == cmd::NAME || MethodRegistry::with_defaults(None).get(name).is_some()
}

/// Whether the named built-in method can show two images at once.
pub fn method_supports_dual(name: &str) -> bool {
    name == cmd::NAME
        || MethodRegistry::with_defaults(None)
            .get(name)
            .is_some_and(|m| m.supports_dual())
}

//  Helpers shared by the methods

/// The first image, or [`ApplyError::NoImage`].
pub(crate) fn first<'a>(images: &[&'a Path]) -> Result<&'a Path, ApplyError> {
    images.first().copied().ok_or(ApplyError::NoImage)
}

/// Log when a single-image method is handed a pair.
pub(crate) fn note_single_only(method: &str, images: &[&Path]) {
    if images.len() > 1 {
        debug!("{} does not support dual mode, applying first image only", method);
    }
}

/// Borrow `path` as UTF-8.
pub(crate) fn utf8(path: &Path) -> Result<&str, ApplyError> {
    path.to_str()
        .ok_or_else(|| ApplyError::NonUtf8Path(path.to_path_buf()))
}

/// `file://` URI for an absolute path.
pub(crate) fn file_uri(path: &Path) -> Result<String, ApplyError> {
    Ok(format!("file://{}", utf8(path)?))
}

fn program_name(command: &Command) -> String {
    command.get_program().to_string_lossy().into_owned()
}

/// Run `command` to completion and map a non-zero exit to an error.
pub(crate) fn run(command: &mut Command) -> Result<(), ApplyError> {
    let program = program_name(command);
    debug!("running {:?}", command);
    let status = command.status().map_err(|source| ApplyError::Spawn {
        program: program.clone(),
        source,
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(ApplyError::Failed { program, status })
    }
}

/// Run `command` for an optional setting; failures are only logged.
pub(crate) fn best_effort(command: &mut Command) {
    if let Err(e) = run(command) {
        debug!("ignoring optional step: {}", e);
    }
}

/// Run `command` and capture its stdout.
pub(crate) fn output(command: &mut Command) -> Result<String, ApplyError> {
    let program = program_name(command);
    debug!("running {:?}", command);
    let out = command.output().map_err(|source| ApplyError::Spawn {
        program: program.clone(),
        source,
    })?;
    if !out.status.success() {
        return Err(ApplyError::Failed {
            program,
            status: out.status,
        });
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

//  Tests
