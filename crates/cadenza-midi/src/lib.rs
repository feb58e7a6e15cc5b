//! Cadenza MIDI Collaborators
//!
//! Standard MIDI File implementations of the external contracts in
//! `cadenza-core`:
//!
//! - [`MidiRenderer`]: persists reconstructed tick tensors as playable
//!   `.mid` files.
//! - [`MidiDataset`]: enumerates a corpus directory of MIDI files and
//!   quantizes monophonic melodies onto the tick grid.
//!
//! Both sides agree on the grid: one tensor tick is one `subdivision`-th of
//! a quarter note, so a tensor rendered by this crate parses back to the
//! same tensor (up to trailing silence).

pub mod dataset;
pub mod render;

pub use dataset::MidiDataset;
pub use render::MidiRenderer;
