//! **bgcycle**: a desktop background rotator.
//!
//! A running instance shows the images of a shuffled pool one after
//! another, changing every `interval` seconds.  Later invocations of the
//! program steer it (`--next`, `--prev`, `--stop`) by signalling the PID
//! recorded in the instance lock file.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::BackgroundApplier`] abstracts setting the background so
//!   the rotation loop is not coupled to any desktop environment.
//! * [`traits::RequestSource`] abstracts the transport that delivers
//!   control requests so the loop is not coupled to OS signals.
//!
//! The loop itself is [`engine::RotationEngine`], which owns an
//! [`pool::ImagePool`] and drains a [`control::Mailbox`].  Desktop methods
//! live in [`applier`], single-instance coordination in [`lock`] and
//! [`control`], image discovery in [`scan`].

pub mod applier;
pub mod cli;
pub mod config;
pub mod control;
pub mod engine;
pub mod lock;
pub mod pool;
pub mod scan;
pub mod traits;
