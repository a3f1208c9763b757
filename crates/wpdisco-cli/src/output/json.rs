//! JSON output formatting

use anyhow::Result;
use serde::Serialize;

pub struct JsonFormatter;

impl JsonFormatter {
    /// Print any report as a pretty JSON object
    pub fn print<T: Serialize>(report: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        println!("{json}");
        Ok(())
    }
}
