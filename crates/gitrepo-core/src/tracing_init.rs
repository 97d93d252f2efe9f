//! Log output for programs embedding gitrepo.
//!
//! Every spawned git process is logged with its `op_id`, and each captured
//! output line is logged at debug level under the same id. All of it goes to
//! stderr; stdout belongs to whatever the program prints for its user.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `default_filter` (for example
/// `"gitrepo_core=info,gitrepo=info"`). With `json` set, each event is one
/// JSON object per line.
pub fn init_tracing(default_filter: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (plain, structured) = if json {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(fmt::layer().with_writer(std::io::stderr)), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(structured)
        .init();
}
