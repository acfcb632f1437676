/// Track model - one instrument lane of fixed-length steps
use std::fmt;
use std::str::FromStr;

use super::note::Note;
use crate::error::SequencerError;

/// Oscillator waveform used to voice a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timbre {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Timbre {
    pub const ALL: [Timbre; 4] = [Timbre::Sine, Timbre::Square, Timbre::Sawtooth, Timbre::Triangle];

    pub fn name(self) -> &'static str {
        match self {
            Timbre::Sine => "sine",
            Timbre::Square => "square",
            Timbre::Sawtooth => "sawtooth",
            Timbre::Triangle => "triangle",
        }
    }
}

impl fmt::Display for Timbre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Timbre {
    type Err = SequencerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timbre::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SequencerError::UnknownTimbre(s.to_string()))
    }
}

/// Display colour of a track lane (sRGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const BLACK: Color = Color([0, 0, 0]);
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    steps: Vec<Note>,
    pub name: String,
    pub color: Color,
    pub timbre: Timbre,
}

impl Track {
    /// A track of `grid_size` copies of `blank`
    pub fn new(name: impl Into<String>, grid_size: usize, blank: Note) -> Self {
        Self {
            steps: vec![blank; grid_size],
            name: name.into(),
            color: Color::BLACK,
            timbre: Timbre::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Note] {
        &self.steps
    }

    pub fn get(&self, offset: usize) -> Option<&Note> {
        self.steps.get(offset)
    }

    pub fn get_mut(&mut self, offset: usize) -> Option<&mut Note> {
        self.steps.get_mut(offset)
    }

    /// Replaces the whole step; returns false if `offset` is outside the grid
    pub fn set(&mut self, offset: usize, note: Note) -> bool {
        match self.steps.get_mut(offset) {
            Some(step) => {
                *step = note;
                true
            }
            None => false,
        }
    }

    pub fn sounding_steps(&self) -> usize {
        self.steps.iter().filter(|n| n.is_sounding()).count()
    }
}
