//! Plain X11: draw the image on the root window with `xview`.

use super::{first, note_single_only, run, utf8, ApplyError};
use crate::traits::BackgroundApplier;
use std::path::Path;
use std::process::Command;

pub struct Xview;

impl BackgroundApplier for Xview {
    fn name(&self) -> &'static str {
        "xview"
    }

    fn description(&self) -> &'static str {
        "set image on X root window using xview"
    }

    fn apply(&self, images: &[&Path]) -> Result<(), ApplyError> {
        note_single_only(self.name(), images);
        let image = first(images)?;
        run(Command::new("xview").args(["-onroot", "-quiet"]).arg(utf8(image)?))
    }
}
