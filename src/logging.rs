use tracing_subscriber::EnvFilter;

/// stderr にログを出す
///
/// `RUST_LOG` があればそれに従う。なければ警告のみ、`--verbose` で本クレートのdebugまで
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,vin_scan=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .try_init();
}
