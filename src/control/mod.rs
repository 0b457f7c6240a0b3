//! Control requests and their delivery.
//!
//! A controller invocation (`--next`, `--prev`, `--stop`) finds the running
//! instance through the [`InstanceLock`] file and sends it a signal.  Inside
//! the running instance a [`SignalListener`](listener::SignalListener) turns
//! signals back into [`ControlRequest`]s and posts them into a single-slot
//! [`Mailbox`] that the engine drains once per polling slice.
//!
//! # Signal mapping
//!
//! | request     | signal    |
//! |-------------|-----------|
//! | `Advance`   | `SIGUSR1` |
//! | `Retreat`   | `SIGUSR2` |
//! | `Terminate` | `SIGINT`  |
//!
//! The mapping is stable; scripts may send these signals directly.
//! `SIGTERM` is also accepted as `Terminate`.

pub mod listener;

use crate::lock::{InstanceLock, LockError};
use log::debug;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// A request sent to the running instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlRequest {
    /// Show the next image(s) now.
    Advance,
    /// Show the previous image(s) now.
    Retreat,
    /// Stop rotating and exit.
    Terminate,
}

impl fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlRequest::Advance => write!(f, "advance"),
            ControlRequest::Retreat => write!(f, "retreat"),
            ControlRequest::Terminate => write!(f, "terminate"),
        }
    }
}

impl ControlRequest {
    /// The signal that carries this request.
    pub const fn signal(self) -> i32 {
        match self {
            ControlRequest::Advance => libc::SIGUSR1,
            ControlRequest::Retreat => libc::SIGUSR2,
            ControlRequest::Terminate => libc::SIGINT,
        }
    }

    /// The request carried by `signal`, if any.
    pub const fn from_signal(signal: i32) -> Option<Self> {
        match signal {
            libc::SIGUSR1 => Some(ControlRequest::Advance),
            libc::SIGUSR2 => Some(ControlRequest::Retreat),
            libc::SIGINT | libc::SIGTERM => Some(ControlRequest::Terminate),
            _ => None,
        }
    }
}

//  Mailbox

/// Single-slot hand-off between a request source and the engine.
///
/// At most one request is pending.  Posting while a request is pending
/// replaces it, so rapid-fire requests within one polling slice coalesce to
/// the latest.
#[derive(Debug, Default)]
pub struct Mailbox {
    slot: Mutex<Option<ControlRequest>>,
    posted: Condvar,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave `request` for the engine, replacing any pending one.
    pub fn post(&self, request: ControlRequest) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(request) {
            debug!("request {} superseded by {}", previous, request);
        }
        self.posted.notify_all();
    }

    /// Take the pending request without waiting.
    pub fn take(&self) -> Option<ControlRequest> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Wait up to `timeout` for a request.
    ///
    /// Returns as soon as a request is pending, or `None` once the full
    /// timeout has elapsed without one.
    pub fn wait(&self, timeout: Duration) -> Option<ControlRequest> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(request) = slot.take() {
                return Some(request);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            slot = self
                .posted
                .wait_timeout(slot, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

//  Controller side

/// Errors from signalling the running instance.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// No process holds the lock, or its PID could not be read.
    #[error("no running instance found via {}", .0.display())]
    NotRunning(std::path::PathBuf),
    /// The lock file could not be probed.
    #[error(transparent)]
    Lock(LockError),
    /// The signal could not be delivered, e.g. because the owner exited
    /// after its PID was read.
    #[error("could not signal process {pid}: {source}")]
    Delivery {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

/// Send `request` to the instance holding the lock at `lock_path`.
///
/// The lock is probed first: if the probe can take it, nobody is running
/// (a leftover file is cleaned up) and [`ControlError::NotRunning`] is
/// returned.  Otherwise the owner's PID is read from the file and signalled.
/// Delivery is fire-and-forget; on success the signalled PID is returned.
pub fn signal_running_instance(
    lock_path: &Path,
    request: ControlRequest,
) -> Result<u32, ControlError> {
    let mut probe = InstanceLock::new(lock_path);
    let pid = match probe.try_acquire() {
        Ok(()) => {
            probe.release();
            return Err(ControlError::NotRunning(lock_path.to_path_buf()));
        }
        Err(LockError::AlreadyLocked { pid, .. }) => pid,
        Err(e) => return Err(ControlError::Lock(e)),
    };

    let pid = pid.ok_or_else(|| ControlError::NotRunning(lock_path.to_path_buf()))?;
    send_signal(pid, request.signal())?;
    debug!("sent {} to process {}", request, pid);
    Ok(pid)
}

fn send_signal(pid: u32, signal: i32) -> Result<(), ControlError> {
    let target = libc::pid_t::try_from(pid)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| ControlError::Delivery {
            pid,
            source: io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"),
        })?;
    // SAFETY: kill(2) has no memory-safety preconditions.
    let result = unsafe { libc::kill(target, signal) };
    if result == 0 {
        Ok(())
    } else {
        Err(ControlError::Delivery {
            pid,
            source: io::Error::last_os_error(),
        })
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_lock_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("bgcycle-control-test-{}-{}.pid", std::process::id(), id))
    }

    #[test]
    fn signal_mapping_is_stable() {
        assert_eq!(ControlRequest::Advance.signal(), libc::SIGUSR1);
        assert_eq!(ControlRequest::Retreat.signal(), libc::SIGUSR2);
        assert_eq!(ControlRequest::Terminate.signal(), libc::SIGINT);
        for req in [ControlRequest::Advance, ControlRequest::Retreat, ControlRequest::Terminate] {
            assert_eq!(ControlRequest::from_signal(req.signal()), Some(req));
        }
        assert_eq!(ControlRequest::from_signal(libc::SIGTERM), Some(ControlRequest::Terminate));
        assert_eq!(ControlRequest::from_signal(libc::SIGHUP), None);
    }

    #[test]
    fn mailbox_coalesces_to_latest() {
        let mb = Mailbox::new();
        mb.post(ControlRequest::Advance);
        mb.post(ControlRequest::Retreat);
        assert_eq!(mb.wait(Duration::from_millis(10)), Some(ControlRequest::Retreat));
        assert_eq!(mb.take(), None);
    }

    #[test]
    fn mailbox_wait_times_out_when_empty() {
        let mb = Mailbox::new();
        let start = Instant::now();
        assert_eq!(mb.wait(Duration::from_millis(30)), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn mailbox_wait_wakes_on_post() {
        let mb = Arc::new(Mailbox::new());
        let poster = Arc::clone(&mb);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            poster.post(ControlRequest::Terminate);
        });
        let start = Instant::now();
        assert_eq!(mb.wait(Duration::from_secs(5)), Some(ControlRequest::Terminate));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn no_lock_holder_means_not_running() {
        let path = tmp_lock_path();
        let err = signal_running_instance(&path, ControlRequest::Advance).unwrap_err();
        assert!(matches!(err, ControlError::NotRunning(_)));
        assert!(!path.exists(), "probe must clean up after itself");
    }

    #[test]
    fn stale_file_means_not_running() {
        let path = tmp_lock_path();
        std::fs::write(&path, "4242\n").unwrap();
        let err = signal_running_instance(&path, ControlRequest::Terminate).unwrap_err();
        assert!(matches!(err, ControlError::NotRunning(_)));
    }

    #[test]
    fn held_lock_without_pid_means_not_running() {
        let path = tmp_lock_path();
        let mut holder = InstanceLock::new(&path);
        holder.try_acquire().unwrap();
        std::fs::write(&path, "").unwrap();
        let err = signal_running_instance(&path, ControlRequest::Advance).unwrap_err();
        assert!(matches!(err, ControlError::NotRunning(_)));
    }

    #[test]
    fn out_of_range_pid_is_a_delivery_error() {
        assert!(matches!(
            send_signal(u32::MAX, 0),
            Err(ControlError::Delivery { .. })
        ));
    }
}
