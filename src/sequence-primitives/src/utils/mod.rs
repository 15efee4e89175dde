//! Shared helpers for the packed wire formats.

pub mod bytes;
