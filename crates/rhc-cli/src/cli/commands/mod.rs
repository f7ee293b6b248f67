//! CLI command handlers, one file per command.

mod config;
mod policy;
mod request;

pub use config::run_config;
pub use policy::run_policy;
pub use request::run_request;

#[cfg(test)]
pub use request::parse_header;
