//! Admin client for the relay's IP access gate.

pub mod api;

pub use api::{AdminClient, ClientError, IpStatus, Outcome};
