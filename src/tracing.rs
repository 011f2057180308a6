//! Tracing initialization.
//!
//! Logs go to stderr: stdout carries the MCP protocol.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Initialize tracing with compact output. Safe to call multiple times.
pub fn init() {
    init_with(LogFormat::Compact);
}

/// Initialize tracing. Only the first call has any effect.
///
/// `RUST_LOG` overrides the default level (`info`, or `debug` under a test
/// runner).
pub fn init_with(format: LogFormat) {
    INIT.call_once(|| {
        let is_test =
            std::env::var("NEXTEST").is_ok() || std::env::var("CARGO_TARGET_TMPDIR").is_ok();
        let default_level = if is_test {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };
        let filter = EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy();

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_target(true);

        if is_test {
            // Another test harness may already own the global subscriber
            let _ = builder.compact().with_test_writer().try_init();
            return;
        }

        let result = match format {
            LogFormat::Compact => builder.compact().with_writer(std::io::stderr).try_init(),
            LogFormat::Json => builder.json().with_writer(std::io::stderr).try_init(),
        };
        if let Err(e) = result {
            eprintln!("Failed to initialize tracing: {}", e);
        }
    });
}
