//! HTTP API for the stored project document and photo blobs.

pub mod server;
pub mod types;

pub use server::{ApiState, build_router, start_server};
