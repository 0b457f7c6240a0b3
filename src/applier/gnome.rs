//! GNOME methods: `gconftool-2` for GNOME 2, `gsettings` for GNOME Shell.

use super::{best_effort, file_uri, first, note_single_only, run, utf8, ApplyError};
use crate::traits::BackgroundApplier;
use std::path::Path;
use std::process::Command;

/// GNOME 2 via `gconftool-2`.
pub struct Gnome2;

impl BackgroundApplier for Gnome2 {
    fn name(&self) -> &'static str {
        "gnome2"
    }

    fn description(&self) -> &'static str {
        "Gnome 2 gconftool-2 method"
    }

    fn apply(&self, images: &[&Path]) -> Result<(), ApplyError> {
        note_single_only(self.name(), images);
        let image = first(images)?;
        run(Command::new("gconftool-2")
            .args(["--set", "--type=string", "/desktop/gnome/background/picture_filename"])
            .arg(utf8(image)?))
    }
}

/// GNOME 3+ via `gsettings`, forced onto the dconf backend.
pub struct GnomeShell;

impl BackgroundApplier for GnomeShell {
    fn name(&self) -> &'static str {
        "gnome-shell"
    }

    fn description(&self) -> &'static str {
        "Gnome 3 gsettings method"
    }

    fn apply(&self, images: &[&Path]) -> Result<(), ApplyError> {
        note_single_only(self.name(), images);
        let uri = file_uri(first(images)?)?;
        run(gsettings().arg("picture-uri").arg(&uri))?;

        // Best-effort: the dark variant only exists on GNOME 42+.
        best_effort(
            gsettings()
                .arg("picture-uri-dark")
                .arg(&uri)
                .stderr(std::process::Stdio::null()),
        );
        Ok(())
    }
}

fn gsettings() -> Command {
    let mut command = Command::new("gsettings");
    command
        .env("GSETTINGS_BACKEND", "dconf")
        .args(["set", "org.gnome.desktop.background"]);
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gsettings_targets_background_schema() {
        let cmd = gsettings();
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["set", "org.gnome.desktop.background"]);
    }

    #[test]
    fn gnome_methods_reject_empty_input() {
        assert!(matches!(Gnome2.apply(&[]), Err(ApplyError::NoImage)));
        assert!(matches!(GnomeShell.apply(&[]), Err(ApplyError::NoImage)));
    }
}
