//! Signal-driven [`RequestSource`].
//!
//! Handlers are installed by [`SignalListener::register`], before the
//! listener thread starts, so a signal that arrives early is queued instead
//! of killing the process.  [`run`](RequestSource::run) then maps each
//! signal to a [`ControlRequest`] and posts it into the [`Mailbox`].

use super::{ControlRequest, Mailbox};
use crate::traits::RequestSource;
use log::{debug, info};
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR1, SIGUSR2};
use signal_hook::iterator::{Handle, Signals};
use std::sync::Arc;

/// Signals the listener takes over from their default dispositions.
const SIGNALS: [i32; 5] = [SIGUSR1, SIGUSR2, SIGINT, SIGTERM, SIGHUP];

/// Errors produced by the signal listener.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("failed to register signal handlers: {0}")]
    Register(#[from] std::io::Error),
}

/// A [`RequestSource`] fed by OS signals.
pub struct SignalListener {
    signals: Signals,
}

/// Stops a running [`SignalListener`] from another thread.
#[derive(Clone)]
pub struct ListenerHandle(Handle);

impl ListenerHandle {
    /// Make the listener's [`run`](RequestSource::run) return.
    pub fn close(&self) {
        self.0.close();
    }
}

impl SignalListener {
    /// Install handlers for the control signals.
    pub fn register() -> Result<Self, ListenerError> {
        let signals = Signals::new(SIGNALS)?;
        Ok(Self { signals })
    }

    /// A handle for shutting the listener down.
    pub fn handle(&self) -> ListenerHandle {
        ListenerHandle(self.signals.handle())
    }
}

impl RequestSource for SignalListener {
    type Error = ListenerError;

    /// Block, posting a request for every control signal, until the
    /// listener is closed through its [`ListenerHandle`].
    fn run(&mut self, mailbox: Arc<Mailbox>) -> Result<(), Self::Error> {
        info!("listening for control signals");
        for signal in self.signals.forever() {
            match ControlRequest::from_signal(signal) {
                Some(request) => {
                    debug!("signal {} -> {}", signal, request);
                    mailbox.post(request);
                }
                None => debug!("ignoring signal {}", signal),
            }
        }
        debug!("signal listener closed");
        Ok(())
    }
}
