//! Client for the relay's `/api/admin/*` endpoints.

mod client;
mod types;

pub use client::{AdminClient, ClientError};
pub use types::*;
