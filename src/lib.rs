/// steptrack - a step-based music tracker core
///
/// This library provides the pieces of a tracker's playback engine:
/// - Fixed-length step grids per track, with note, octave and volume per step
/// - A transport clock that ticks once per beat at the current tempo
/// - Editing commands that keep step data consistent during playback
/// - Audio output for previewing and MIDI output for external instruments

pub mod audio;
pub mod config;
pub mod error;
pub mod midi;
pub mod sequencer;

// Re-export commonly used types
pub use audio::{AudioOutput, AudioTrigger, ToneEvent, ToneTrigger};
pub use config::SequencerConfig;
pub use error::{AudioError, ConfigError, MidiError, SequencerError};
pub use midi::{midi_note_name, MidiOutputDevice};
pub use sequencer::playback::{PlaybackEngine, PlaybackEvent};
pub use sequencer::{
    Color, Editor, Note, Pitch, PitchClass, Sequencer, Timbre, Track, TransportState,
};
