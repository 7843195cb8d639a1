use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. Output goes to stderr; stdout carries
/// protocol responses only. `RUST_LOG` overrides the default `info` level.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("[core] tracing subscriber already installed");
    }
}
