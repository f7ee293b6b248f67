//! `--events`: retry events as JSON lines on stderr.

use rhc_core::telemetry::{RetryEvent, TelemetrySink};
use std::io::Write;

pub struct JsonLinesSink;

impl TelemetrySink for JsonLinesSink {
    fn emit(&self, event: &RetryEvent) {
        match serde_json::to_string(event) {
            Ok(line) => {
                let _ = writeln!(std::io::stderr().lock(), "{}", line);
            }
            Err(e) => tracing::debug!("could not serialize retry event: {}", e),
        }
    }
}
