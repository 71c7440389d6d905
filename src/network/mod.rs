//! HTTP networking module
//!
//! Outgoing requests to the search provider.

mod client;
mod user_agent;

pub use client::HttpClient;
pub use user_agent::generate_user_agent;
