//! Resilient outbound HTTP calls: failure classification, backoff, nested
//! retry budgets and an outcome pipeline over the final result.

pub mod client;
pub mod config;
pub mod http;
pub mod logging;
pub mod pipeline;
pub mod redact;
pub mod retry;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use client::Client;
