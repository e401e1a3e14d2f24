use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive, e.g.
/// `ASHELL_LOG=ashell::process=debug`.
pub const LOG_ENV_VAR: &str = "ASHELL_LOG";

/// Installs the stderr subscriber. `ASHELL_LOG` wins over the default level,
/// which is `warn`, or `debug` when `debug` is set. Calling this twice is
/// harmless.
pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };

    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug)
        .with_filter(env_filter);

    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}
