/// Note model - the content of a single step
use std::fmt;
use std::str::FromStr;

use crate::error::SequencerError;

pub const MIN_OCTAVE: u8 = 0;
pub const MAX_OCTAVE: u8 = 7;
pub const MAX_VOLUME: u8 = 100;

/// Label of the empty step
pub const EMPTY_LABEL: &str = "-";
/// Label of the explicit rest marker
pub const OFF_LABEL: &str = "#";

/// Frequency of A at octave 0, the reference for the frequency table
const A0_HZ: f32 = 27.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C
    pub fn semitone(self) -> u8 {
        self as u8
    }

    pub fn from_semitone(semitone: u8) -> Self {
        Self::ALL[(semitone % 12) as usize]
    }

    pub fn label(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    pub fn is_sharp(self) -> bool {
        self.label().ends_with('#')
    }
}

/// Frequency of a pitch class at octave 0 (equal temperament, A0 = 27.5 Hz)
pub fn base_frequency(pitch_class: PitchClass) -> f32 {
    let from_a = pitch_class.semitone() as f32 - PitchClass::A.semitone() as f32;
    A0_HZ * 2.0_f32.powf(from_a / 12.0)
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PitchClass {
    type Err = SequencerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PitchClass::ALL
            .into_iter()
            .find(|pc| pc.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SequencerError::UnknownPitch(s.to_string()))
    }
}

/// What a step plays: nothing, an explicit rest, or a pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Pitch {
    #[default]
    Empty,
    Off,
    Class(PitchClass),
}

impl Pitch {
    /// Empty and Off never sound
    pub fn is_sentinel(self) -> bool {
        matches!(self, Pitch::Empty | Pitch::Off)
    }

    pub fn pitch_class(self) -> Option<PitchClass> {
        match self {
            Pitch::Class(pc) => Some(pc),
            Pitch::Empty | Pitch::Off => None,
        }
    }
}

impl From<PitchClass> for Pitch {
    fn from(pc: PitchClass) -> Self {
        Pitch::Class(pc)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pitch::Empty => f.write_str(EMPTY_LABEL),
            Pitch::Off => f.write_str(OFF_LABEL),
            Pitch::Class(pc) => write!(f, "{}", pc),
        }
    }
}

impl FromStr for Pitch {
    type Err = SequencerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            EMPTY_LABEL => Ok(Pitch::Empty),
            OFF_LABEL => Ok(Pitch::Off),
            other => other.parse().map(Pitch::Class),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub pitch: Pitch,
    pub octave: u8,
    pub volume: u8,
}

impl Note {
    /// The step every grid starts with
    pub const EMPTY: Note = Note {
        pitch: Pitch::Empty,
        octave: 4,
        volume: 80,
    };

    /// Builds a note with octave and volume clamped into range
    pub fn new(pitch: impl Into<Pitch>, octave: u8, volume: u8) -> Self {
        Self {
            pitch: pitch.into(),
            octave: octave.min(MAX_OCTAVE),
            volume: volume.min(MAX_VOLUME),
        }
    }

    /// An empty step carrying the given octave and volume defaults
    pub fn blank(octave: u8, volume: u8) -> Self {
        Self::new(Pitch::Empty, octave, volume)
    }

    pub fn is_sounding(&self) -> bool {
        !self.pitch.is_sentinel()
    }

    /// Frequency in Hz, or None for sentinel steps
    pub fn frequency(&self) -> Option<f32> {
        self.pitch
            .pitch_class()
            .map(|pc| base_frequency(pc) * 2.0_f32.powi(self.octave as i32))
    }

    /// Volume moved by `delta`, saturating at 0 and 100
    pub fn adjusted_volume(&self, delta: i32) -> u8 {
        (self.volume as i32 + delta).clamp(0, MAX_VOLUME as i32) as u8
    }

    /// Octave moved by `delta`, or None if it would leave 0..=7
    pub fn shifted_octave(&self, delta: i32) -> Option<u8> {
        let next = self.octave as i32 + delta;
        (MIN_OCTAVE as i32..=MAX_OCTAVE as i32)
            .contains(&next)
            .then_some(next as u8)
    }
}

impl Default for Note {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pitch {
            Pitch::Class(pc) => write!(f, "{}{}", pc, self.octave),
            sentinel => write!(f, "{}", sentinel),
        }
    }
}
