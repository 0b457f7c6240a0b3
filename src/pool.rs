//! Cyclic image pool.
//!
//! The [`ImagePool`] owns an ordered, immutable list of image paths and a
//! cursor into it.  The order is whatever the collector produced (usually
//! shuffled once at startup); the pool itself never reorders.
//!
//! Which images are "current" depends on the [`DisplayMode`]: a single
//! display shows the image under the cursor, a dual setup shows that image
//! and its successor.

use std::path::{Path, PathBuf};

/// How many images are presented at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// One image for the whole desktop.
    Single,
    /// Two distinct images, e.g. one per monitor.
    Dual,
}

impl DisplayMode {
    /// Map the `dual` setting to a mode.
    pub fn from_dual(dual: bool) -> Self {
        if dual {
            DisplayMode::Dual
        } else {
            DisplayMode::Single
        }
    }

    /// Number of images presented per change.
    pub fn width(self) -> usize {
        match self {
            DisplayMode::Single => 1,
            DisplayMode::Dual => 2,
        }
    }
}

/// Errors from building a pool.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PoolError {
    /// No images to rotate through.
    #[error("image pool is empty")]
    Empty,
}

/// Immutable ordered image list with a wrapping cursor.
///
/// A pool always holds at least one image: [`ImagePool::new`] refuses an
/// empty list, so cursor arithmetic never divides by zero.
#[derive(Debug, Clone)]
pub struct ImagePool {
    images: Vec<PathBuf>,
    /// Always in `0..images.len()`.
    cursor: usize,
}

impl ImagePool {
    /// Build a pool positioned at the first image.
    pub fn new(images: Vec<PathBuf>) -> Result<Self, PoolError> {
        if images.is_empty() {
            return Err(PoolError::Empty);
        }
        Ok(Self { images, cursor: 0 })
    }

    //  Accessors

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of images in the pool.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// All images, in rotation order.
    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    /// The image `n` steps ahead of the cursor.
    pub fn nth(&self, n: usize) -> &Path {
        let len = self.images.len();
        &self.images[(self.cursor + n % len) % len]
    }

    /// The image(s) to present for `mode`.
    ///
    /// In dual mode with a single-image pool the same image is returned
    /// twice.
    pub fn current(&self, mode: DisplayMode) -> Vec<&Path> {
        (0..mode.width()).map(|n| self.nth(n)).collect()
    }

    //  Navigation

    /// Move the cursor forward by `steps`, wrapping around.
    pub fn advance(&mut self, steps: usize) {
        let len = self.images.len();
        self.cursor = (self.cursor + steps % len) % len;
    }

    /// Move the cursor back by `steps`, wrapping around.
    pub fn retreat(&mut self, steps: usize) {
        let len = self.images.len();
        self.cursor = (self.cursor + len - steps % len) % len;
    }
}

//  Tests
