//! Directory-backed MIDI dataset provider.
//!
//! Scans a corpus directory for `.mid` / `.midi` files and converts each
//! monophonic melody to a tick tensor on the configured subdivision grid.
//! The piece identifier is the file stem. Polyphony is resolved
//! monophonically: a new onset cuts whatever note is sounding.

use std::fs;
use std::path::{Path, PathBuf};

use midly::{MidiMessage, Smf, Timing, TrackEventKind};
use walkdir::WalkDir;

use cadenza_core::{DatasetError, DatasetProvider, TickTensor, HOLD, REST};

/// A corpus of MIDI files under one directory.
pub struct MidiDataset {
    root: PathBuf,
    /// Tensor ticks per quarter note.
    subdivision: u32,
}

impl MidiDataset {
    /// Creates a dataset over `root` at the given subdivision (reference
    /// value 6).
    pub fn new(root: impl Into<PathBuf>, subdivision: u16) -> Self {
        Self {
            root: root.into(),
            subdivision: subdivision.max(1) as u32,
        }
    }

    fn scan(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("mid") | Some("midi")
                )
            })
            .collect();
        paths.sort();
        paths
    }

    fn path_for(&self, id: &str) -> Option<PathBuf> {
        self.scan().into_iter().find(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .map(|stem| stem == id)
                .unwrap_or(false)
        })
    }

    fn parse_tensor(&self, id: &str, path: &Path) -> Result<TickTensor, DatasetError> {
        let bytes = fs::read(path)?;
        let smf = Smf::parse(&bytes).map_err(|err| DatasetError::Malformed {
            id: id.to_string(),
            reason: err.to_string(),
        })?;

        let ticks_per_quarter = match smf.header.timing {
            Timing::Metrical(tpq) => tpq.as_int() as u32,
            Timing::Timecode(..) => {
                return Err(DatasetError::Malformed {
                    id: id.to_string(),
                    reason: "SMPTE timecode timing is not supported".to_string(),
                })
            }
        };

        // Melody track: the one with the most note onsets.
        let track = smf
            .tracks
            .iter()
            .max_by_key(|track| {
                track
                    .iter()
                    .filter(|event| {
                        matches!(
                            event.kind,
                            TrackEventKind::Midi {
                                message: MidiMessage::NoteOn { vel, .. },
                                ..
                            } if vel.as_int() > 0
                        )
                    })
                    .count()
            })
            .ok_or_else(|| DatasetError::Malformed {
                id: id.to_string(),
                reason: "no tracks".to_string(),
            })?;

        // Collect (pitch, start_slot, end_slot) intervals.
        let mut notes: Vec<(u8, usize, usize)> = Vec::new();
        let mut sounding: Option<(u8, usize)> = None;
        let mut tick: u32 = 0;
        let to_slot = |tick: u32| -> usize {
            ((tick as u64 * self.subdivision as u64 + ticks_per_quarter as u64 / 2)
                / ticks_per_quarter as u64) as usize
        };

        for event in track {
            tick = tick.saturating_add(event.delta.as_int());
            let TrackEventKind::Midi { message, .. } = event.kind else {
                continue;
            };
            match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    let slot = to_slot(tick);
                    if let Some((pitch, start)) = sounding.take() {
                        notes.push((pitch, start, slot));
                    }
                    sounding = Some((key.as_int(), slot));
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    if let Some((pitch, start)) = sounding.take() {
                        if pitch == key.as_int() {
                            notes.push((pitch, start, to_slot(tick)));
                        } else {
                            // Off for a note we are not tracking; keep the
                            // sounding one.
                            sounding = Some((pitch, start));
                        }
                    }
                }
                _ => {}
            }
        }
        if let Some((pitch, start)) = sounding.take() {
            notes.push((pitch, start, to_slot(tick)));
        }

        if notes.is_empty() {
            return Err(DatasetError::Malformed {
                id: id.to_string(),
                reason: "no note events".to_string(),
            });
        }

        let length = notes
            .iter()
            .map(|&(_, _, end)| end)
            .max()
            .unwrap_or(0);
        let mut codes = vec![REST; length];
        for window in notes.windows(2) {
            let (pitch, start, end) = window[0];
            // A following onset cuts the note short.
            let end = end.min(window[1].1).max(start + 1).min(length);
            fill_note(&mut codes, pitch, start, end);
        }
        if let Some(&(pitch, start, end)) = notes.last() {
            let end = end.max(start + 1).min(length);
            fill_note(&mut codes, pitch, start, end);
        }

        Ok(TickTensor::new(codes))
    }
}

fn fill_note(codes: &mut [u16], pitch: u8, start: usize, end: usize) {
    if start >= codes.len() {
        return;
    }
    codes[start] = pitch as u16;
    for slot in (start + 1)..end.min(codes.len()) {
        codes[slot] = HOLD;
    }
}

impl DatasetProvider for MidiDataset {
    fn piece_ids(&self) -> Vec<String> {
        self.scan()
            .iter()
            .filter_map(|path| path.file_stem().and_then(|stem| stem.to_str()))
            .map(str::to_string)
            .collect()
    }

    fn load_tensor(&self, id: &str) -> Result<TickTensor, DatasetError> {
        let path = self
            .path_for(id)
            .ok_or_else(|| DatasetError::UnknownPiece(id.to_string()))?;
        self.parse_tensor(id, &path)
    }
}
