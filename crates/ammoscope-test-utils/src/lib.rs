//! Shared test helpers for the Ammoscope workspace.

pub mod fixtures;
