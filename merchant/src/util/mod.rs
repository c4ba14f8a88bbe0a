//! Process plumbing for the server.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`sig_down`] | Graceful shutdown on SIGTERM and SIGINT |
//! | [`telemetry`] | `tracing` subscriber and HTTP request spans |

pub mod sig_down;
pub mod telemetry;

pub use sig_down::*;
pub use telemetry::*;
