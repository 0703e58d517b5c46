pub mod build_info;

use std::{env, path::PathBuf, sync::Once};

use dirs::home_dir;

const DEFAULT_DIR_NAME: &str = ".worksbill";

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber; `RUST_LOG` refines the default `worksbill=info`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = "worksbill=info".parse() {
            filter = filter.add_directive(directive);
        }

        // A subscriber installed by an embedding application wins.
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Application data directory: `WORKSBILL_HOME` when set, otherwise `~/.worksbill`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os("WORKSBILL_HOME") {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}
