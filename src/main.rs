use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fleetdash::app;
use fleetdash::config::{Cli, DashboardConfig};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match DashboardConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fleetdash: {}", err);
            return ExitCode::FAILURE;
        }
    };

    // The terminal belongs to the dashboard, so logs go to a file.
    let appender = tracing_appender::rolling::daily(&config.log_dir, "fleetdash.log");
    let (writer, _log_guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    let should_quit = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        if let Err(err) = signal_hook::flag::register(signal, Arc::clone(&should_quit)) {
            error!(signal, error = %err, "failed to register signal handler");
        }
    }

    // Restore the terminal if anything panics while it is in raw mode.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        app::restore_terminal();
        default_hook(panic_info);
    }));

    info!(interval_ms = config.interval.as_millis() as u64, demo = config.demo, "starting");
    match app::run(config, should_quit) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            app::restore_terminal();
            error!(error = %err, "terminal error");
            eprintln!("fleetdash: {}", err);
            ExitCode::FAILURE
        }
    }
}
