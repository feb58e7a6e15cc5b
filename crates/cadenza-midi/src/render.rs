//! MIDI output from tick tensors.
//!
//! Converts a reconstructed tensor into a Standard MIDI File for playback.
//! Output is SMF Format 1: a tempo track plus one melody track. The tensor's
//! tick grid maps onto MIDI ticks through the subdivision (tensor ticks per
//! quarter note).

use std::fs;
use std::path::PathBuf;

use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};

use cadenza_core::{RenderError, ScoreRenderer, TickTensor, HOLD, NOTE_MAX, REST};

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Fixed playback tempo.
const TEMPO_BPM: u32 = 120;

/// Note-on velocity for rendered melodies.
const VELOCITY: u8 = 90;

/// Renders tick tensors as Standard MIDI Files in a fixed output directory.
pub struct MidiRenderer {
    out_dir: PathBuf,
    /// MIDI ticks spanned by one tensor tick.
    ticks_per_slot: u32,
}

impl MidiRenderer {
    /// Creates a renderer writing into `out_dir` at the given subdivision
    /// (tensor ticks per quarter note, reference value 6).
    pub fn new(out_dir: impl Into<PathBuf>, subdivision: u16) -> Self {
        let subdivision = subdivision.max(1);
        Self {
            out_dir: out_dir.into(),
            ticks_per_slot: TICKS_PER_QUARTER as u32 / subdivision as u32,
        }
    }

    fn tensor_to_smf(&self, tensor: &TickTensor) -> Result<Smf<'static>, RenderError> {
        let mut smf = Smf::new(Header::new(
            Format::Parallel,
            Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
        ));

        // Track 0: tempo track
        let mut tempo_track: Track<'static> = Vec::new();
        let tempo_microseconds = 60_000_000 / TEMPO_BPM;
        tempo_track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(midly::MetaMessage::Tempo(u24::new(tempo_microseconds))),
        });
        tempo_track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(midly::MetaMessage::EndOfTrack),
        });
        smf.tracks.push(tempo_track);

        // Track 1: melody
        let channel = u4::new(0);
        let mut track: Track<'static> = Vec::new();
        let mut last_event_tick: u32 = 0;
        let mut sounding: Option<u8> = None;

        let push_off = |track: &mut Track<'static>, pitch: u8, at: u32, last: &mut u32| {
            track.push(TrackEvent {
                delta: u28::new(at - *last),
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOff {
                        key: u7::new(pitch),
                        vel: u7::new(0),
                    },
                },
            });
            *last = at;
        };

        for (slot, &code) in tensor.codes().iter().enumerate() {
            let slot_tick = slot as u32 * self.ticks_per_slot;
            match code {
                HOLD => {
                    // Continuation of the sounding note, or of silence.
                }
                REST => {
                    if let Some(pitch) = sounding.take() {
                        push_off(&mut track, pitch, slot_tick, &mut last_event_tick);
                    }
                }
                pitch if pitch <= NOTE_MAX => {
                    if let Some(prev) = sounding.take() {
                        push_off(&mut track, prev, slot_tick, &mut last_event_tick);
                    }
                    track.push(TrackEvent {
                        delta: u28::new(slot_tick - last_event_tick),
                        kind: TrackEventKind::Midi {
                            channel,
                            message: MidiMessage::NoteOn {
                                key: u7::new(pitch as u8),
                                vel: u7::new(VELOCITY),
                            },
                        },
                    });
                    last_event_tick = slot_tick;
                    sounding = Some(pitch as u8);
                }
                other => {
                    return Err(RenderError::Encode(format!(
                        "event code {other} is outside the vocabulary"
                    )));
                }
            }
        }

        let end_tick = tensor.len() as u32 * self.ticks_per_slot;
        if let Some(pitch) = sounding.take() {
            push_off(&mut track, pitch, end_tick, &mut last_event_tick);
        }
        track.push(TrackEvent {
            delta: u28::new(end_tick - last_event_tick),
            kind: TrackEventKind::Meta(midly::MetaMessage::EndOfTrack),
        });
        smf.tracks.push(track);

        Ok(smf)
    }
}

impl ScoreRenderer for MidiRenderer {
    fn render(&self, tensor: &TickTensor, name: &str) -> Result<PathBuf, RenderError> {
        let smf = self.tensor_to_smf(tensor)?;

        let mut buf = Vec::new();
        smf.write(&mut buf)
            .map_err(|err| RenderError::Encode(err.to_string()))?;

        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(format!("{name}.mid"));
        fs::write(&path, &buf)?;
        Ok(path)
    }
}
