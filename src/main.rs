//! Entry point for **bgcycle**.
//!
//! Two modes:
//!
//! * With `--next`, `--prev` or `--stop` the invocation is a controller: it
//!   signals the running instance and exits.
//! * Otherwise it installs the signal handlers, takes the instance lock,
//!   collects images, detaches (unless `--foreground`), and rotates until
//!   told to stop.  Control
//!   signals are received on a background thread and handed to the rotation
//!   loop on the main thread.

use bgcycle::applier::{cmd::UserCommand, MethodRegistry};
use bgcycle::cli::Args;
use bgcycle::config::{default_config_path, Config, ConfigError};
use bgcycle::control::listener::SignalListener;
use bgcycle::control::{signal_running_instance, ControlError, ControlRequest, Mailbox};
use bgcycle::engine::RotationEngine;
use bgcycle::lock::{InstanceLock, LockError};
use bgcycle::pool::ImagePool;
use bgcycle::scan;
use bgcycle::traits::RequestSource;
use clap::Parser;
use log::{debug, error, info, LevelFilter};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

fn init_logging(level: Option<LevelFilter>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.init();
}

/// Load the file named by `--config`, or the default file if present.
fn load_config(args: &Args) -> Result<Config, ConfigError> {
    if let Some(path) = &args.config {
        return Config::load(path);
    }
    let path = default_config_path();
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            Ok(cfg)
        }
        Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            info!("no config file at {}, using defaults", path.display());
            Ok(Config::default())
        }
        Err(e) => Err(e),
    }
}

//  Main

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level);

    let mut config = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    config.merge_args(&args);

    if let Some(request) = args.control_request() {
        return run_controller(&config.lock_path(), request);
    }

    if config.method == "help" {
        print_methods(config.cmd.as_deref());
        return ExitCode::SUCCESS;
    }

    run_rotation(&config)
}

/// `--method help`.
fn print_methods(user_cmd: Option<&str>) {
    let mut registry = MethodRegistry::with_defaults(user_cmd);
    if user_cmd.is_none() {
        registry.register(Box::new(UserCommand::new("")));
    }
    println!("Supported methods:");
    for method in registry.iter() {
        println!("{}: {}", method.name(), method.description());
    }
}

/// Controller invocation.
fn run_controller(lock_path: &Path, request: ControlRequest) -> ExitCode {
    match signal_running_instance(lock_path, request) {
        Ok(pid) => {
            debug!("sent {} to process {}", request, pid);
            ExitCode::SUCCESS
        }
        Err(ControlError::NotRunning(path)) => {
            error!(
                "could not get the PID of a running instance from {}. Is it running?",
                path.display()
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Rotating invocation.
fn run_rotation(config: &Config) -> ExitCode {
    let settings = match config.resolve() {
        Ok(s) => s,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let registry = MethodRegistry::with_defaults(settings.cmd.as_deref());
    let Some(applier) = registry.get(&settings.method) else {
        error!("method '{}' is not available", settings.method);
        return ExitCode::FAILURE;
    };

    // Handlers must be installed before the PID is published; they survive
    // `daemon(0, 0)`.
    let mut listener = match SignalListener::register() {
        Ok(l) => l,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut lock = InstanceLock::new(&settings.lock_path);
    if let Err(e) = lock.try_acquire() {
        report_lock_error(&e);
        return ExitCode::FAILURE;
    }

    let mut files = scan::collect(&settings.roots, &settings.filter);
    scan::shuffle(&mut files);
    let pool = match ImagePool::new(files) {
        Ok(pool) => pool,
        Err(e) => {
            error!(
                "{}: no matching files found (check your directories and inclusion criteria)",
                e
            );
            return ExitCode::FAILURE;
        }
    };
    info!("found {} suitable file(s)", pool.len());

    if !settings.foreground {
        // The lock is tied to this process; the detached child takes it
        // again.
        lock.release();
        if let Err(e) = daemonize() {
            error!("failed to detach: {}", e);
            return ExitCode::FAILURE;
        }
        if let Err(e) = lock.try_acquire() {
            report_lock_error(&e);
            return ExitCode::FAILURE;
        }
    }

    let listener_handle = listener.handle();
    let mailbox = Arc::new(Mailbox::new());
    let listener_thread = {
        let mailbox = Arc::clone(&mailbox);
        std::thread::spawn(move || {
            if let Err(e) = listener.run(mailbox) {
                error!("signal listener error: {}", e);
            }
        })
    };

    let mut engine = RotationEngine::new(pool, applier, settings.mode, settings.interval);
    engine.run(&mailbox);

    listener_handle.close();
    if listener_thread.join().is_err() {
        error!("signal listener thread panicked");
    }
    lock.release();
    ExitCode::SUCCESS
}

fn report_lock_error(e: &LockError) {
    match e {
        LockError::AlreadyLocked { .. } => {
            error!("can't lock: {}", e);
            error!("if you're sure the program isn't already running, delete this file");
        }
        LockError::Io { .. } => error!("{}", e),
    }
}

/// Detach from the controlling terminal: fork, start a new session, change
/// to `/` and point the standard streams at `/dev/null`.
fn daemonize() -> std::io::Result<()> {
    // SAFETY: called before any other thread is spawned.
    if unsafe { libc::daemon(0, 0) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}
