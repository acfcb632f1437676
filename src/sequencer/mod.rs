/// Core sequencer logic - tracks, step cursor, transport state and editing.
/// Time is driven from outside: each call to [`Sequencer::tick`] plays one
/// step, see [`playback::PlaybackEngine`] for the clocked version.
pub mod note;
pub mod playback;
pub mod track;
pub mod transport;

pub use note::{base_frequency, Note, Pitch, PitchClass};
pub use track::{Color, Timbre, Track};
pub use transport::{tempo_to_interval, tempo_to_interval_ms, Transport};

use std::time::Duration;

use crate::audio::ToneTrigger;
use crate::config::{SequencerConfig, MAX_GRID_SIZE, MAX_TRACKS};
use crate::error::{Result, SequencerError};

pub const MIN_TEMPO: u32 = 50;
pub const MAX_TEMPO: u32 = 300;
/// Volume change applied by one increment/decrement
pub const VOLUME_STEP: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// The editing surface currently open, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Editor {
    TrackOptions { track: usize },
    NoteEntry { track: usize, offset: usize },
}

impl Editor {
    pub fn track(&self) -> usize {
        match *self {
            Editor::TrackOptions { track } | Editor::NoteEntry { track, .. } => track,
        }
    }
}

pub struct Sequencer {
    tracks: Vec<Track>,
    grid_size: usize,
    max_tracks: usize,
    blank: Note,
    cursor: usize,
    tempo: u32,
    state: TransportState,
    editor: Option<Editor>,
    track_counter: u32,
}

impl Sequencer {
    pub fn new(config: &SequencerConfig) -> Self {
        Self {
            tracks: Vec::new(),
            grid_size: config.grid_size.clamp(1, MAX_GRID_SIZE),
            max_tracks: config.max_tracks.min(MAX_TRACKS),
            blank: Note::blank(config.default_octave, config.default_volume),
            cursor: 0,
            tempo: clamp_tempo(config.initial_tempo as i64),
            state: TransportState::Stopped,
            editor: None,
            track_counter: 0,
        }
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn max_tracks(&self) -> usize {
        self.max_tracks
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    /// Step interval at the current tempo
    pub fn step_interval(&self) -> Duration {
        tempo_to_interval(self.tempo)
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn editor(&self) -> Option<Editor> {
        self.editor
    }

    // Transport, driven by PlaybackEngine so the clock follows the state

    pub(crate) fn play(&mut self) {
        if self.state != TransportState::Playing {
            log::info!("play from step {}", self.cursor);
        }
        self.state = TransportState::Playing;
    }

    /// Only a playing sequencer can pause
    pub(crate) fn pause(&mut self) {
        if self.state != TransportState::Playing {
            log::debug!("pause ignored while {:?}", self.state);
            return;
        }
        log::info!("pause at step {}", self.cursor);
        self.state = TransportState::Paused;
    }

    pub(crate) fn stop(&mut self) {
        log::info!("stop");
        self.state = TransportState::Stopped;
        self.cursor = 0;
    }

    /// Sounds every non-sentinel note at the cursor, then advances the cursor
    /// with wraparound. Does nothing unless playing. Returns the step played.
    pub fn tick(&mut self, output: &mut impl ToneTrigger) -> Option<usize> {
        if !self.is_playing() {
            return None;
        }

        let step = self.cursor;
        for track in &self.tracks {
            let Some(note) = track.get(step) else {
                continue;
            };
            if let Some(frequency) = note.frequency() {
                output.trigger(track.timbre, note.volume, frequency);
            }
        }

        self.cursor = (step + 1) % self.grid_size;
        Some(step)
    }

    // Tracks

    /// Appends a track named after a counter that advances on every call,
    /// even when the track limit refuses the new track
    pub fn add_track(&mut self) {
        self.track_counter += 1;

        if self.tracks.len() >= self.max_tracks {
            log::debug!("track limit of {} reached", self.max_tracks);
            return;
        }

        let name = format!("Track {}", self.track_counter);
        self.tracks.push(Track::new(name, self.grid_size, self.blank));
    }

    /// Removes a track; later tracks shift down one index. An editor that
    /// targets the removed or a shifted track is closed.
    pub fn delete_track(&mut self, index: usize) -> Result<Track> {
        self.check_track(index)?;
        let removed = self.tracks.remove(index);

        if self.editor.is_some_and(|e| e.track() >= index) {
            log::debug!("closing editor targeting shifted track");
            self.editor = None;
        }
        Ok(removed)
    }

    // Editors

    /// Opens an editor, replacing whichever one was open
    pub fn open_editor(&mut self, editor: Editor) -> Result<()> {
        match editor {
            Editor::TrackOptions { track } => self.check_track(track)?,
            Editor::NoteEntry { track, offset } => self.check_step(track, offset)?,
        }
        self.editor = Some(editor);
        Ok(())
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    fn options_target(&mut self) -> Result<&mut Track> {
        match self.editor {
            Some(Editor::TrackOptions { track }) => {
                let len = self.tracks.len();
                self.tracks
                    .get_mut(track)
                    .ok_or(SequencerError::TrackOutOfRange { index: track, len })
            }
            Some(Editor::NoteEntry { .. }) => Err(SequencerError::WrongEditor {
                expected: "track options",
            }),
            None => Err(SequencerError::NoEditorOpen),
        }
    }

    fn note_entry_target(&self) -> Result<(usize, usize)> {
        match self.editor {
            Some(Editor::NoteEntry { track, offset }) => {
                self.check_step(track, offset)?;
                Ok((track, offset))
            }
            Some(Editor::TrackOptions { .. }) => Err(SequencerError::WrongEditor {
                expected: "note entry",
            }),
            None => Err(SequencerError::NoEditorOpen),
        }
    }

    pub fn set_track_color(&mut self, color: Color) -> Result<()> {
        self.options_target()?.color = color;
        Ok(())
    }

    pub fn set_track_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.options_target()?.name = name.into();
        Ok(())
    }

    pub fn set_track_timbre(&mut self, timbre: Timbre) -> Result<()> {
        self.options_target()?.timbre = timbre;
        Ok(())
    }

    // Steps

    /// Moves a step's volume by `delta`, saturating at 0 and 100
    pub fn adjust_volume(&mut self, track: usize, offset: usize, delta: i32) -> Result<()> {
        let note = self.step_mut(track, offset)?;
        note.volume = note.adjusted_volume(delta);
        Ok(())
    }

    pub fn increment_volume(&mut self, track: usize, offset: usize) -> Result<()> {
        self.adjust_volume(track, offset, VOLUME_STEP)
    }

    pub fn decrement_volume(&mut self, track: usize, offset: usize) -> Result<()> {
        self.adjust_volume(track, offset, -VOLUME_STEP)
    }

    /// Sets the pitch of the note-entry target, keeping its octave and
    /// volume, and closes the note-entry editor
    pub fn insert_note(&mut self, pitch: impl Into<Pitch>) -> Result<()> {
        let (track, offset) = self.note_entry_target()?;
        let note = self.step_mut(track, offset)?;
        *note = Note {
            pitch: pitch.into(),
            ..*note
        };
        self.editor = None;
        Ok(())
    }

    /// Resets a step to the empty note; needs no open editor
    pub fn remove_note(&mut self, track: usize, offset: usize) -> Result<()> {
        self.check_step(track, offset)?;
        self.tracks[track].set(offset, self.blank);
        Ok(())
    }

    /// Octave of the note-entry target
    pub fn current_octave(&self) -> Result<u8> {
        let (track, offset) = self.note_entry_target()?;
        Ok(self.tracks[track].steps()[offset].octave)
    }

    /// Moves the note-entry target's octave by `delta`. An edit that would
    /// leave 0..=7 is refused and leaves the octave unchanged.
    pub fn change_octave(&mut self, delta: i32) -> Result<()> {
        let (track, offset) = self.note_entry_target()?;
        let note = self.step_mut(track, offset)?;
        match note.shifted_octave(delta) {
            Some(octave) => note.octave = octave,
            None => log::debug!("octave change {:+} refused at octave {}", delta, note.octave),
        }
        Ok(())
    }

    /// Stores the tempo clamped into 50..=300. A running clock keeps its
    /// interval until playback is restarted.
    pub fn set_tempo(&mut self, bpm: i64) {
        self.tempo = clamp_tempo(bpm);
    }

    fn check_track(&self, index: usize) -> Result<()> {
        if index < self.tracks.len() {
            Ok(())
        } else {
            Err(SequencerError::TrackOutOfRange {
                index,
                len: self.tracks.len(),
            })
        }
    }

    fn check_step(&self, track: usize, offset: usize) -> Result<()> {
        self.check_track(track)?;
        if offset < self.grid_size {
            Ok(())
        } else {
            Err(SequencerError::StepOutOfRange {
                offset,
                grid_size: self.grid_size,
            })
        }
    }

    fn step_mut(&mut self, track: usize, offset: usize) -> Result<&mut Note> {
        self.check_step(track, offset)?;
        let grid_size = self.grid_size;
        self.tracks[track]
            .get_mut(offset)
            .ok_or(SequencerError::StepOutOfRange { offset, grid_size })
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(&SequencerConfig::default())
    }
}

fn clamp_tempo(bpm: i64) -> u32 {
    bpm.clamp(MIN_TEMPO as i64, MAX_TEMPO as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ToneEvent;

    fn sequencer_with_tracks(count: usize) -> Sequencer {
        let mut seq = Sequencer::default();
        for _ in 0..count {
            seq.add_track();
        }
        seq
    }

    fn place(seq: &mut Sequencer, track: usize, offset: usize, pitch: PitchClass) {
        seq.open_editor(Editor::NoteEntry { track, offset }).unwrap();
        seq.insert_note(pitch).unwrap();
    }

    #[test]
    fn test_sequencer_defaults() {
        let seq = Sequencer::default();
        assert_eq!(seq.grid_size(), 16);
        assert_eq!(seq.max_tracks(), 8);
        assert_eq!(seq.tempo(), 120);
        assert_eq!(seq.cursor(), 0);
        assert_eq!(seq.state(), TransportState::Stopped);
        assert_eq!(seq.step_interval(), Duration::from_millis(500));
        assert!(seq.tracks().is_empty());
    }

    #[test]
    fn test_set_tempo_clamps() {
        let mut seq = Sequencer::default();
        for (input, expected) in [(10, 50), (-4, 50), (50, 50), (175, 175), (300, 300), (999, 300)] {
            seq.set_tempo(input);
            assert_eq!(seq.tempo(), expected);
        }
    }

    #[test]
    fn test_cursor_wraps_after_grid() {
        let mut seq = sequencer_with_tracks(1);
        let mut out: Vec<ToneEvent> = Vec::new();
        seq.play();
        for i in 0..16 {
            assert_eq!(seq.tick(&mut out), Some(i));
            assert!(seq.cursor() < 16);
        }
        assert_eq!(seq.cursor(), 0);
    }

    #[test]
    fn test_tick_does_nothing_when_not_playing() {
        let mut seq = sequencer_with_tracks(1);
        place(&mut seq, 0, 0, PitchClass::C);
        let mut out: Vec<ToneEvent> = Vec::new();
        assert_eq!(seq.tick(&mut out), None);
        assert!(out.is_empty());
        assert_eq!(seq.cursor(), 0);
    }

    #[test]
    fn test_empty_tracks_never_sound() {
        let mut seq = sequencer_with_tracks(3);
        seq.open_editor(Editor::NoteEntry { track: 1, offset: 4 }).unwrap();
        seq.insert_note(Pitch::Off).unwrap();

        let mut out: Vec<ToneEvent> = Vec::new();
        seq.play();
        for _ in 0..seq.grid_size() {
            seq.tick(&mut out);
        }
        assert!(out.is_empty());
    }

    #[test]
    fn test_tick_sounds_all_tracks_at_cursor() {
        let mut seq = sequencer_with_tracks(3);
        place(&mut seq, 0, 1, PitchClass::A);
        place(&mut seq, 2, 1, PitchClass::C);
        place(&mut seq, 1, 2, PitchClass::E);
        seq.open_editor(Editor::TrackOptions { track: 2 }).unwrap();
        seq.set_track_timbre(Timbre::Square).unwrap();

        let mut out: Vec<ToneEvent> = Vec::new();
        seq.play();
        seq.tick(&mut out);
        assert!(out.is_empty());

        seq.tick(&mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].timbre, Timbre::Sine);
        assert!((out[0].frequency - 440.0).abs() < 0.01);
        assert_eq!(out[0].volume, 80);
        assert_eq!(out[1].timbre, Timbre::Square);
        assert_eq!(seq.cursor(), 2);
    }

    #[test]
    fn test_stop_resets_and_pause_keeps_cursor() {
        let mut seq = sequencer_with_tracks(1);
        let mut out: Vec<ToneEvent> = Vec::new();
        seq.play();
        for _ in 0..5 {
            seq.tick(&mut out);
        }

        seq.pause();
        assert_eq!(seq.state(), TransportState::Paused);
        assert_eq!(seq.cursor(), 5);

        seq.play();
        assert_eq!(seq.tick(&mut out), Some(5));

        seq.stop();
        assert_eq!(seq.cursor(), 0);
        assert!(!seq.is_playing());
    }

    #[test]
    fn test_pause_only_from_playing() {
        let mut seq = Sequencer::default();
        seq.pause();
        assert_eq!(seq.state(), TransportState::Stopped);

        seq.play();
        seq.pause();
        seq.pause();
        assert_eq!(seq.state(), TransportState::Paused);

        seq.stop();
        seq.pause();
        assert_eq!(seq.state(), TransportState::Stopped);
    }

    #[test]
    fn test_oversized_config_is_capped() {
        let config = SequencerConfig {
            grid_size: usize::MAX,
            max_tracks: usize::MAX,
            ..SequencerConfig::default()
        };
        let mut seq = Sequencer::new(&config);
        assert_eq!(seq.grid_size(), MAX_GRID_SIZE);
        assert_eq!(seq.max_tracks(), MAX_TRACKS);

        seq.add_track();
        assert_eq!(seq.tracks()[0].len(), MAX_GRID_SIZE);
    }

    #[test]
    fn test_add_track_past_limit_advances_counter() {
        let mut seq = sequencer_with_tracks(8);
        assert_eq!(seq.tracks().len(), 8);
        assert_eq!(seq.tracks()[7].name, "Track 8");

        seq.add_track();
        assert_eq!(seq.tracks().len(), 8);

        seq.delete_track(0).unwrap();
        seq.add_track();
        assert_eq!(seq.tracks().len(), 8);
        assert_eq!(seq.tracks()[7].name, "Track 10");
    }

    #[test]
    fn test_delete_track_shifts_and_closes_editor() {
        let mut seq = sequencer_with_tracks(3);
        seq.open_editor(Editor::TrackOptions { track: 2 }).unwrap();

        let removed = seq.delete_track(1).unwrap();
        assert_eq!(removed.name, "Track 2");
        assert_eq!(seq.tracks()[1].name, "Track 3");
        assert_eq!(seq.editor(), None);

        seq.open_editor(Editor::TrackOptions { track: 0 }).unwrap();
        seq.delete_track(1).unwrap();
        assert_eq!(seq.editor(), Some(Editor::TrackOptions { track: 0 }));

        assert_eq!(
            seq.delete_track(5).unwrap_err(),
            SequencerError::TrackOutOfRange { index: 5, len: 1 }
        );
    }

    #[test]
    fn test_track_options_need_open_editor() {
        let mut seq = sequencer_with_tracks(2);
        assert_eq!(seq.set_track_name("Lead"), Err(SequencerError::NoEditorOpen));

        seq.open_editor(Editor::NoteEntry { track: 0, offset: 0 }).unwrap();
        assert!(matches!(
            seq.set_track_color(Color([255, 0, 0])),
            Err(SequencerError::WrongEditor { .. })
        ));

        seq.open_editor(Editor::TrackOptions { track: 1 }).unwrap();
        seq.set_track_name("Lead").unwrap();
        seq.set_track_color(Color([255, 0, 0])).unwrap();
        seq.set_track_timbre(Timbre::Triangle).unwrap();

        let track = &seq.tracks()[1];
        assert_eq!(track.name, "Lead");
        assert_eq!(track.color, Color([255, 0, 0]));
        assert_eq!(track.timbre, Timbre::Triangle);
        assert_eq!(seq.editor(), Some(Editor::TrackOptions { track: 1 }));
    }

    #[test]
    fn test_open_editor_replaces_other_and_validates_target() {
        let mut seq = sequencer_with_tracks(1);
        seq.open_editor(Editor::TrackOptions { track: 0 }).unwrap();
        seq.open_editor(Editor::NoteEntry { track: 0, offset: 3 }).unwrap();
        assert_eq!(seq.editor(), Some(Editor::NoteEntry { track: 0, offset: 3 }));

        assert!(seq.open_editor(Editor::NoteEntry { track: 0, offset: 16 }).is_err());
        assert!(seq.open_editor(Editor::TrackOptions { track: 1 }).is_err());

        seq.close_editor();
        assert_eq!(seq.editor(), None);
    }

    #[test]
    fn test_adjust_volume_saturates() {
        let mut seq = sequencer_with_tracks(1);
        seq.adjust_volume(0, 0, 18).unwrap();
        assert_eq!(seq.tracks()[0].steps()[0].volume, 98);

        seq.increment_volume(0, 0).unwrap();
        assert_eq!(seq.tracks()[0].steps()[0].volume, 100);
        seq.increment_volume(0, 0).unwrap();
        assert_eq!(seq.tracks()[0].steps()[0].volume, 100);

        seq.adjust_volume(0, 0, -250).unwrap();
        assert_eq!(seq.tracks()[0].steps()[0].volume, 0);
        seq.decrement_volume(0, 0).unwrap();
        assert_eq!(seq.tracks()[0].steps()[0].volume, 0);

        assert!(seq.adjust_volume(0, 16, 5).is_err());
    }

    #[test]
    fn test_insert_note_keeps_octave_and_volume() {
        let mut seq = sequencer_with_tracks(1);
        seq.open_editor(Editor::NoteEntry { track: 0, offset: 0 }).unwrap();
        assert_eq!(seq.current_octave(), Ok(4));

        seq.insert_note(PitchClass::C).unwrap();
        assert_eq!(
            seq.tracks()[0].steps()[0],
            Note {
                pitch: Pitch::Class(PitchClass::C),
                octave: 4,
                volume: 80
            }
        );
        assert_eq!(seq.editor(), None);
        assert_eq!(seq.insert_note(PitchClass::D), Err(SequencerError::NoEditorOpen));
    }

    #[test]
    fn test_remove_note_without_editor() {
        let mut seq = sequencer_with_tracks(1);
        place(&mut seq, 0, 3, PitchClass::G);
        seq.adjust_volume(0, 3, 10).unwrap();

        seq.remove_note(0, 3).unwrap();
        assert_eq!(seq.tracks()[0].steps()[3], Note::EMPTY);
    }

    #[test]
    fn test_change_octave_refuses_at_bounds() {
        let mut seq = sequencer_with_tracks(1);
        seq.open_editor(Editor::NoteEntry { track: 0, offset: 0 }).unwrap();

        for _ in 0..10 {
            seq.change_octave(1).unwrap();
        }
        assert_eq!(seq.current_octave(), Ok(7));

        for _ in 0..10 {
            seq.change_octave(-1).unwrap();
        }
        assert_eq!(seq.current_octave(), Ok(0));

        for _ in 0..3 {
            seq.change_octave(1).unwrap();
        }
        seq.change_octave(1).unwrap();
        seq.change_octave(-1).unwrap();
        assert_eq!(seq.current_octave(), Ok(3));
    }

    #[test]
    fn test_change_octave_needs_note_entry() {
        let mut seq = sequencer_with_tracks(1);
        assert_eq!(seq.change_octave(1), Err(SequencerError::NoEditorOpen));
        seq.open_editor(Editor::TrackOptions { track: 0 }).unwrap();
        assert!(matches!(
            seq.change_octave(1),
            Err(SequencerError::WrongEditor { .. })
        ));
    }

    #[test]
    fn test_edits_apply_to_next_read() {
        let mut seq = sequencer_with_tracks(1);
        let mut out: Vec<ToneEvent> = Vec::new();
        seq.play();
        seq.tick(&mut out);

        place(&mut seq, 0, 0, PitchClass::C);
        place(&mut seq, 0, 1, PitchClass::D);
        seq.tick(&mut out);
        assert_eq!(out.len(), 1);
        assert!((out[0].frequency - base_frequency(PitchClass::D) * 16.0).abs() < 0.01);
    }
}
