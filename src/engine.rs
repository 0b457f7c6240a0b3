//! The rotation loop.
//!
//! [`RotationEngine`] owns the [`ImagePool`] and reacts to two kinds of
//! events: a polling slice elapsing without a request (the timer), and a
//! [`ControlRequest`] picked up from the [`Mailbox`].  Every change of
//! position is followed by a call to the [`BackgroundApplier`].
//!
//! The engine waits in short slices rather than sleeping for the whole
//! interval, so requests are answered within one slice.  The interval is
//! counted in slices.

use crate::control::{ControlRequest, Mailbox};
use crate::pool::{DisplayMode, ImagePool};
use crate::traits::BackgroundApplier;
use log::{debug, info, warn};
use std::time::Duration;

/// Length of one polling slice unless overridden.
pub const DEFAULT_SLICE: Duration = Duration::from_secs(1);

/// Lifecycle of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Running,
    /// Terminal; entered on [`ControlRequest::Terminate`].
    Stopped,
}

/// What a single [`step`](RotationEngine::step) did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The slice elapsed and the interval has not been reached yet.
    Waited,
    /// Moved forward, either on request or because the interval elapsed.
    Advanced,
    /// Moved back on request.
    Retreated,
    /// The engine is stopped.
    Stopped,
}

/// Event loop merging the interval timer with control requests.
///
/// Generic over the applier so tests can record calls; the binary uses a
/// `dyn BackgroundApplier` from the method registry.
pub struct RotationEngine<'a, A: BackgroundApplier + ?Sized> {
    pool: ImagePool,
    applier: &'a A,
    mode: DisplayMode,
    /// Slices between automatic advances, at least 1.
    interval: u32,
    slice: Duration,
    images_per_cycle: usize,
    /// Slices since the last change of position.
    ticks: u32,
    state: EngineState,
}

impl<'a, A: BackgroundApplier + ?Sized> RotationEngine<'a, A> {
    /// Create an engine that advances every `interval` slices.
    ///
    /// An interval of zero is treated as one.
    pub fn new(pool: ImagePool, applier: &'a A, mode: DisplayMode, interval: u32) -> Self {
        Self {
            pool,
            applier,
            mode,
            interval: interval.max(1),
            slice: DEFAULT_SLICE,
            images_per_cycle: 1,
            ticks: 0,
            state: EngineState::Running,
        }
    }

    /// Use a different polling slice.
    pub fn with_slice(mut self, slice: Duration) -> Self {
        self.slice = slice;
        self
    }

    /// Move this many images per change (at least 1).
    pub fn with_images_per_cycle(mut self, n: usize) -> Self {
        self.images_per_cycle = n.max(1);
        self
    }

    //  Accessors

    pub fn pool(&self) -> &ImagePool {
        &self.pool
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Slices counted since the last change.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn slice(&self) -> Duration {
        self.slice
    }

    //  Loop

    /// Run until a [`ControlRequest::Terminate`] arrives.
    ///
    /// The current image set is applied immediately on entry.
    pub fn run(&mut self, mailbox: &Mailbox) {
        info!(
            "rotating {} image(s) every {} x {:?} using {}",
            self.pool.len(),
            self.interval,
            self.slice,
            self.applier.name()
        );
        self.show_current();

        while self.state == EngineState::Running {
            let request = mailbox.wait(self.slice);
            self.step(request);
        }
        info!("rotation stopped");
    }

    /// Process one polling slice.
    ///
    /// `request` is the request observed during the slice, or `None` if
    /// the slice elapsed without one.  Exactly one action is taken.  Once
    /// stopped, every further step is a no-op.
    pub fn step(&mut self, request: Option<ControlRequest>) -> StepOutcome {
        if self.state == EngineState::Stopped {
            return StepOutcome::Stopped;
        }

        match request {
            Some(ControlRequest::Terminate) => {
                info!("terminate requested");
                self.state = EngineState::Stopped;
                StepOutcome::Stopped
            }
            Some(ControlRequest::Advance) => {
                info!("selecting next image(s)");
                self.pool.advance(self.images_per_cycle);
                self.changed();
                StepOutcome::Advanced
            }
            Some(ControlRequest::Retreat) => {
                info!("selecting previous image(s)");
                self.pool.retreat(self.images_per_cycle);
                self.changed();
                StepOutcome::Retreated
            }
            None => {
                self.ticks += 1;
                if self.ticks >= self.interval {
                    debug!("interval elapsed");
                    self.pool.advance(self.images_per_cycle);
                    self.changed();
                    StepOutcome::Advanced
                } else {
                    StepOutcome::Waited
                }
            }
        }
    }

    fn changed(&mut self) {
        self.ticks = 0;
        self.show_current();
    }

    /// Hand the current image(s) to the applier.  Failures are logged and
    /// otherwise ignored.
    fn show_current(&self) {
        let images = self.pool.current(self.mode);
        debug!("applying {:?} (cursor {})", images, self.pool.cursor());
        if let Err(e) = self.applier.apply(&images) {
            warn!("{} failed: {}", self.applier.name(), e);
        }
    }
}

//  Tests
