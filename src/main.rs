use std::fs::File;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use arenaview::cli::Args;
use arenaview::controller::{Controller, TerminalEvents};
use arenaview::domain::{ViewerConfig, ViewerError};
use arenaview::loader;
use arenaview::model::{Model, Status};
use arenaview::ui::TableUI;

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&args) {
        eprintln!("Error: could not open log file: {e}");
        return ExitCode::FAILURE;
    }
    match run(args) {
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

/// The terminal belongs to the UI, logs go to a file.
fn init_logging(args: &Args) -> Result<(), ViewerError> {
    let file = File::create(args.log_path())?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

/// Restores the terminal however `run` is left.
struct TerminalGuard {
    terminal: ratatui::DefaultTerminal,
}

impl TerminalGuard {
    fn init() -> Self {
        Self {
            terminal: ratatui::init(),
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        ratatui::restore();
    }
}

fn run(args: Args) -> Result<(), ViewerError> {
    let dataset = loader::load(args.data_path())?;
    let name = dataset.name.clone();
    let list = args.build_list(dataset)?;
    info!("Opened {} with {} records", name, list.data().len());

    let cfg = ViewerConfig::default();
    let mut guard = TerminalGuard::init();
    let size = guard.terminal.size()?;

    let mut model = Model::init(&cfg, name, list, size.width as usize, size.height as usize);
    let mut ui = TableUI::new(&cfg);
    let mut controller = Controller::new(&cfg, TerminalEvents);

    while model.status != Status::QUITTING {
        guard.terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        let message = controller.handle_event(&model)?;
        model.update(message);
    }

    Ok(())
}
