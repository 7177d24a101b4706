use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// `RUST_LOG` wins over the built-in directive when it is set.
fn default_filter(verbose: bool) -> EnvFilter {
    let directive = if verbose {
        "rocket_cart=debug,info"
    } else {
        "rocket_cart=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
}

/// Installs the global subscriber. Logs go to stderr so stdout stays clean
/// for the printed cart; `json` switches to one JSON object per line.
pub fn init_logger(verbose: bool, json: bool) {
    let base = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    let layer = if json {
        base.json().boxed()
    } else {
        base.compact().boxed()
    };

    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(layer)
        .init();
}
