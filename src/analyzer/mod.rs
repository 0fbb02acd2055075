use std::path::Path;

use anyhow::Result;

use crate::models::Descriptor;

pub mod gomod;
pub mod gopkg;

/// Reads a project's lockfile into an ordered list of descriptors.
pub trait Analyzer {
    fn analyze(&self, path: &Path) -> Result<Vec<Descriptor>>;
}
