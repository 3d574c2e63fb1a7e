//! Telemetry, tracing setup and trace identifiers

mod trace_id;
mod tracing_setup;

pub use trace_id::TraceId;
pub use tracing_setup::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
