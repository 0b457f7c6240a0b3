//! User-defined command method.
//!
//! The configured program is run directly (no shell) with the image path(s)
//! as arguments: `<cmd> <image>` in single mode, `<cmd> <image> <image2>` in
//! dual mode.

use super::{first, run, ApplyError};
use crate::traits::BackgroundApplier;
use std::path::Path;
use std::process::Command;

/// Registry name of the user command method.
pub const NAME: &str = "cmd";

pub struct UserCommand {
    program: String,
}

impl UserCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The command that would be run for `images`.
    fn command(&self, images: &[&Path]) -> Command {
        let mut command = Command::new(&self.program);
        command.args(images);
        command
    }
}

impl BackgroundApplier for UserCommand {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "User-defined command"
    }

    fn supports_dual(&self) -> bool {
        true
    }

    fn apply(&self, images: &[&Path]) -> Result<(), ApplyError> {
        first(images)?;
        run(&mut self.command(images))
    }
}
