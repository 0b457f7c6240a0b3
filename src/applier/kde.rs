//! KDE Plasma via the PlasmaShell scripting interface.

use super::{file_uri, first, note_single_only, run, ApplyError};
use crate::traits::BackgroundApplier;
use std::path::Path;
use std::process::{Command, Stdio};

pub struct Kde;

/// Plasma 6 ships `qdbus6`, Plasma 5 ships `qdbus`.
fn find_qdbus() -> Option<&'static str> {
    ["qdbus6", "qdbus"].into_iter().find(|exe| {
        Command::new(exe)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    })
}

/// PlasmaShell script that sets `uri` on every desktop.
fn plasma_script(uri: &str) -> String {
    format!(
        "var allDesktops = desktops();\n\
         for (var i = 0; i < allDesktops.length; i++) {{\n\
           var d = allDesktops[i];\n\
           d.wallpaperPlugin = 'org.kde.image';\n\
           d.currentConfigGroup = ['Wallpaper', 'org.kde.image', 'General'];\n\
           d.writeConfig('Image', '{uri}');\n\
         }}\n"
    )
}

impl BackgroundApplier for Kde {
    fn name(&self) -> &'static str {
        "kde"
    }

    fn description(&self) -> &'static str {
        "KDE Plasma qdbus method"
    }

    fn apply(&self, images: &[&Path]) -> Result<(), ApplyError> {
        note_single_only(self.name(), images);
        let uri = file_uri(first(images)?)?;
        let qdbus = find_qdbus().ok_or_else(|| ApplyError::Spawn {
            program: "qdbus".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "neither qdbus6 nor qdbus found"),
        })?;
        run(Command::new(qdbus)
            .args([
                "org.kde.plasmashell",
                "/PlasmaShell",
                "org.kde.PlasmaShell.evaluateScript",
            ])
            .arg(plasma_script(&uri)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_embeds_uri() {
        let s = plasma_script("file:///pics/a.jpg");
        assert!(s.contains("d.writeConfig('Image', 'file:///pics/a.jpg');"));
        assert!(s.contains("org.kde.image"));
    }
}
