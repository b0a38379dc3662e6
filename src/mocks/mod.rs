//! Mock implementations for testing.

mod auth;
mod transport;

pub use auth::MockAuthBackend;
pub use transport::{MockResponse, MockTransport};
