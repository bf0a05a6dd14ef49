use clap::Parser;
use anyhow::{bail, Context, Result};
use std::sync::mpsc;
use std::sync::Arc;

use filesync::{
    cli::Cli,
    spawn_event_loop, Coordinator, FileWatcher, RsyncDispatcher, Shutdown,
};

fn main() {
    let cli = Cli::parse();

    if let Err(err) = cli.validate() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    cli.setup_logging();

    if let Err(err) = run(&cli) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = Arc::new(cli.to_config()?);
    tracing::info!(
        "Mirroring {} to {}",
        config.root_path.display(),
        config.destination.target()
    );

    let watcher = FileWatcher::new(&config.root_path, &config.watcher)?;
    let (tree, events) = watcher.into_parts();

    let dispatcher = RsyncDispatcher::new(Arc::clone(&config));
    let coordinator = Coordinator::new(Arc::clone(&config), tree, dispatcher);

    // Nothing else happens on this thread until we are told to stop, either
    // by a signal or by the event loop going away.
    let (stop_tx, stop_rx) = mpsc::channel();
    let signal_tx = stop_tx.clone();
    ctrlc::set_handler(move || {
        let _ = signal_tx.send(Shutdown::Interrupted);
    })?;

    let handle = spawn_event_loop(coordinator, events, stop_tx)
        .context("Failed to start event loop")?;

    match stop_rx.recv() {
        Ok(Shutdown::EventLoopExited) => match handle.join() {
            Err(_) => bail!("Event loop panicked, no longer watching {}", config.root_path.display()),
            Ok(stats) => bail!("Event loop stopped after {} syncs", stats.syncs),
        },
        Ok(Shutdown::Interrupted) | Err(_) => {
            tracing::info!("Interrupted, exiting");
            Ok(())
        }
    }
}
