//! HTTP access to the replay backend

mod client;

pub use client::{ErrorCallback, ReplayClient};
