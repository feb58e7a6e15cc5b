//! Command implementations for the Cadenza CLI.

pub(crate) mod infill;
pub(crate) mod pieces;
