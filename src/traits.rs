//! Core traits that decouple the rotation loop from any specific desktop
//! environment or control transport.
//!
//! Every concrete backend (a GNOME `gsettings` call, a user command, a
//! signal listener, a test harness, …) implements one of these traits.  The
//! [`RotationEngine`](crate::engine::RotationEngine) only depends on these
//! abstractions.

use crate::applier::ApplyError;
use crate::control::Mailbox;
use std::path::Path;
use std::sync::Arc;

/// A way of setting the desktop background.
///
/// Implementations are registered by name in a
/// [`MethodRegistry`](crate::applier::MethodRegistry) and resolved once at
/// startup.  The trait is object safe so the registry can hold any mix of
/// methods.
pub trait BackgroundApplier {
    /// Stable method name used on the command line and in the config file.
    fn name(&self) -> &'static str;

    /// One-line human description, shown by `--method help`.
    fn description(&self) -> &'static str;

    /// Whether the method can show two different images at once.
    fn supports_dual(&self) -> bool {
        false
    }

    /// Set the background to `images`.
    ///
    /// Called with exactly one path in single mode and exactly two in dual
    /// mode.  A method without dual support applies only the first image.
    /// Failures are reported to the caller, which logs them and carries on.
    fn apply(&self, images: &[&Path]) -> Result<(), ApplyError>;
}

//  Request Source

/// A source of [`ControlRequest`](crate::control::ControlRequest)s.
///
/// Implementations listen on some transport (OS signals, a test harness,
/// …) and post every request into the shared [`Mailbox`], where the engine
/// picks it up on its next polling slice.
///
/// # Contract
///
/// * [`run`](RequestSource::run) **blocks** until the source is closed or an
///   unrecoverable error occurs.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait RequestSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and post every incoming request into `mailbox`.
    fn run(&mut self, mailbox: Arc<Mailbox>) -> Result<(), Self::Error>;
}
