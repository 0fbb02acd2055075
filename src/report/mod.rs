//! Report renderers.
//!
//! - JSON with the field names downstream consumers already parse.
//! - [`cyclonedx`]: a CycloneDX 1.5 BOM.
//! - [`terminal`]: colored summary and tables; respects `--verbose` / `--quiet`.

pub mod cyclonedx;
pub mod terminal;

use crate::models::Report;

pub fn to_json(report: &Report) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
