//! Global subscriber installation. Kept in its own test binary because the
//! subscriber is process-wide.

use tds2024b::tracing_init::{self, OutputFormat, TracingConfig};
use tds2024b::ScopeConfig;
use tracing::Level;

#[test]
fn repeated_initialisation_is_a_no_op() {
    assert!(!tracing::dispatcher::has_been_set());

    tracing_init::init(TracingConfig::new(Level::DEBUG).with_ansi(false)).unwrap();
    assert!(tracing::dispatcher::has_been_set());

    tracing_init::init(TracingConfig::new(Level::WARN).with_format(OutputFormat::Json)).unwrap();
    tracing_init::init_from_config(&ScopeConfig::default()).unwrap();
    tracing::info!("subscriber still usable");
}
