//! Log setup for the command-line tools.

use std::str::FromStr;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding log targets, e.g. `posegen_core=debug,info`.
pub const LOG_ENV_VAR: &str = "POSEGEN_LOG";

/// Log filter from `value`, or `info` for everything when unset.
pub fn targets(value: Option<&str>) -> anyhow::Result<Targets> {
    match value {
        Some(directives) if !directives.trim().is_empty() => Targets::from_str(directives)
            .map_err(|e| anyhow::anyhow!("invalid {LOG_ENV_VAR} value '{directives}': {e}")),
        _ => Ok(Targets::new().with_default(LevelFilter::INFO)),
    }
}

/// Install a `fmt` subscriber filtered by [`LOG_ENV_VAR`].
pub fn init_tracing() -> anyhow::Result<()> {
    let directives = std::env::var(LOG_ENV_VAR).ok();
    tracing_subscriber::registry()
        .with(targets(directives.as_deref())?)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn defaults_to_info() {
        let targets = targets(None).unwrap();
        assert!(targets.would_enable("posegen_core::dataset", &Level::INFO));
        assert!(!targets.would_enable("posegen_core::dataset", &Level::DEBUG));
    }

    #[test]
    fn parses_per_target_levels() {
        let targets = targets(Some("posegen_core=debug,warn")).unwrap();
        assert!(targets.would_enable("posegen_core::train", &Level::DEBUG));
        assert!(!targets.would_enable("hf_hub", &Level::INFO));
    }

    #[test]
    fn rejects_garbage() {
        assert!(targets(Some("posegen=loud")).is_err());
    }
}
