pub mod error;
pub mod http;
pub(crate) mod lock;
pub mod telemetry;
