use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Level used when `RUST_LOG` is unset. Warnings stay quiet by default since
/// the CLI prints its own localized notice for each of them.
pub fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "error"
    }
}

/// Diagnostics go to stderr so they never mix with the progress line.
/// `RUST_LOG` overrides the default level.
pub fn init(verbose: bool) -> Result<(), LogError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose),
        )
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_follows_verbosity() {
        assert_eq!(default_level(false), "error");
        assert_eq!(default_level(true), "debug");
    }

    #[test]
    fn second_init_is_rejected() {
        let _ = init(false);
        assert!(matches!(init(true), Err(LogError::AlreadyInitialized(_))));
    }
}
