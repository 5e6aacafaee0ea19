//! Umbrella crate for Gearspin.
//!
//! This crate is intentionally small: it re-exports the harness and manifest
//! crates so downstream code can depend on a single crate name (`gearspin`).

pub use gearspin_harness as harness;
pub use gearspin_manifest as manifest;
