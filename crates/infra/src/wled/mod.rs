//! WLED device integration

mod client;

pub use client::{WledClient, WledClientConfig};
