//! Xfce via `xfconf-query`.
//!
//! Xfce keeps one `last-image` property per monitor and workspace, e.g.
//! `/backdrop/screen0/monitorDP-1/workspace0/last-image`.  Every such
//! property on `screen0` is updated; in dual mode the monitors (in sorted
//! order) take turns between the two images.

use super::{first, output, run, utf8, ApplyError};
use crate::traits::BackgroundApplier;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

pub struct Xfce4;

const CHANNEL: &str = "xfce4-desktop";

/// Pick the `last-image` properties of `screen0` out of a property listing
/// and group them by monitor, in sorted monitor order.
fn image_properties(listing: &str) -> BTreeMap<String, Vec<String>> {
    let mut by_monitor: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for prop in listing.lines().map(str::trim) {
        if !prop.contains("last-image") || !prop.contains("screen0") {
            continue;
        }
        let monitor = prop
            .split('/')
            .find(|seg| seg.starts_with("monitor"))
            .unwrap_or("")
            .to_string();
        by_monitor.entry(monitor).or_default().push(prop.to_string());
    }
    by_monitor
}

/// `(property, image)` pairs assigning `images` round-robin over monitors.
fn assignments<'a>(
    by_monitor: &'a BTreeMap<String, Vec<String>>,
    images: &[&'a Path],
) -> Vec<(&'a str, &'a Path)> {
    by_monitor
        .values()
        .enumerate()
        .flat_map(|(i, props)| {
            let image = images[i % images.len()];
            props.iter().map(move |p| (p.as_str(), image))
        })
        .collect()
}

impl BackgroundApplier for Xfce4 {
    fn name(&self) -> &'static str {
        "xfce4"
    }

    fn description(&self) -> &'static str {
        "Xfce4 desktop method"
    }

    fn supports_dual(&self) -> bool {
        true
    }

    fn apply(&self, images: &[&Path]) -> Result<(), ApplyError> {
        first(images)?;
        let listing = output(Command::new("xfconf-query").args(["-c", CHANNEL, "--list"]))?;
        let by_monitor = image_properties(&listing);
        for (prop, image) in assignments(&by_monitor, images) {
            run(Command::new("xfconf-query")
                .args(["-c", CHANNEL, "-p", prop, "--set"])
                .arg(utf8(image)?))?;
        }
        Ok(())
    }
}
