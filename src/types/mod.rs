// Download registry shared type definitions
// Each submodule defines types used across the crate.

pub mod download;
pub mod errors;
pub mod event;
pub mod settings;
