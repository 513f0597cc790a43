//! Logging initialization for the CLI
//!
//! `RUST_LOG` wins when set; otherwise `--verbose` switches the ferrum crates
//! from `warn` to `debug`. Logs go to stderr so converted documents on
//! stdout stay clean.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_logging(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,ferrum_cli={level},ferrum_models={level},ferrum_format={level},ferrum_validator={level}"
        ))
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    if json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
