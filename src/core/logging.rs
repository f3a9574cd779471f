//! Logger setup

/// Install the `env_logger` backend for the `log` facade.
///
/// Honours `RUST_LOG`; defaults to `info`. Calling it more than once is
/// harmless, the first logger stays installed.
pub fn init() {
    init_with_default("info");
}

/// Install the logger with a custom default filter, e.g. `"assetgate=debug"`.
pub fn init_with_default(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    if env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
        .is_err()
    {
        log::debug!("Logger already initialized");
    }
}
