#![windows_subsystem = "windows"]
use std::io;

use tracing::{error, info};
use xliff_core::{logging, protocol};

fn main() {
    logging::init();
    info!(version = env!("CARGO_PKG_VERSION"), "XLIFF conversion core ready");

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(e) = protocol::serve(stdin.lock(), stdout.lock()) {
        error!("response channel closed: {e}");
    }
}
