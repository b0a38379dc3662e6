//! Structured logging.
//!
//! Every resolver branch and facade operation emits a `tracing` event. This
//! module only wires a subscriber for applications that have none.
//!
//! ```no_run
//! use simple_google_drive::observability::{LogFormat, LoggingConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! LoggingConfig::from_env().with_format(LogFormat::Compact).init()?;
//! # Ok(())
//! # }
//! ```

mod logging;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
