use angmon_core::{AngmonError, AngmonResult};
use tracing_subscriber::EnvFilter;

/// Install a stderr fmt subscriber. `RUST_LOG` wins over `default_level`.
///
/// Returns `Ok(false)` when a global subscriber was already installed, so it
/// can be called from every entry point and test.
pub fn init(default_level: &str) -> AngmonResult<bool> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| AngmonError::Config(format!("invalid log filter '{default_level}': {e}")))?;
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok())
}
