/// MIDI output using midir
use midir::{MidiOutput, MidiOutputConnection};

use crate::audio::ToneTrigger;
use crate::error::MidiError;
use crate::sequencer::{PitchClass, Timbre};

const CLIENT_NAME: &str = "steptrack MIDI Output";

pub struct MidiOutputDevice {
    connection: Option<MidiOutputConnection>,
    held: Vec<u8>,
}

impl MidiOutputDevice {
    pub fn new() -> Self {
        Self {
            connection: None,
            held: Vec::new(),
        }
    }

    pub fn available_ports() -> Vec<String> {
        match MidiOutput::new(CLIENT_NAME) {
            Ok(midi_out) => midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect(),
            Err(err) => {
                log::warn!("cannot list MIDI ports: {}", err);
                vec![]
            }
        }
    }

    pub fn connect(&mut self, port_index: usize) -> Result<(), MidiError> {
        let midi_out = MidiOutput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;

        let ports = midi_out.ports();
        let port = ports
            .get(port_index)
            .ok_or(MidiError::InvalidPort(port_index))?;

        let connection = midi_out
            .connect(port, "steptrack")
            .map_err(|e| MidiError::Connect(e.to_string()))?;

        log::info!("connected MIDI output port {}", port_index);
        self.connection = Some(connection);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn send_note_on(&mut self, note: u8, velocity: u8) -> Result<(), MidiError> {
        if let Some(ref mut conn) = self.connection {
            conn.send(&[0x90, note, velocity]).map_err(|e| MidiError::Send {
                kind: "note on",
                message: e.to_string(),
            })?;
            self.held.push(note);
        }
        Ok(())
    }

    pub fn send_note_off(&mut self, note: u8) -> Result<(), MidiError> {
        self.held.retain(|held| *held != note);
        if let Some(ref mut conn) = self.connection {
            conn.send(&[0x80, note, 0]).map_err(|e| MidiError::Send {
                kind: "note off",
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Sends note-off for every note still held
    pub fn release_all(&mut self) {
        for note in std::mem::take(&mut self.held) {
            if let Err(err) = self.send_note_off(note) {
                log::warn!("{}", err);
            }
        }
    }

    pub fn disconnect(&mut self) {
        self.release_all();
        self.connection = None;
    }
}

impl Default for MidiOutputDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// Voices tones as MIDI notes; timbre is left to the receiving instrument
impl ToneTrigger for MidiOutputDevice {
    fn trigger(&mut self, _timbre: Timbre, volume: u8, frequency: f32) {
        let Some(note) = frequency_to_midi_note(frequency) else {
            return;
        };
        if let Err(err) = self.send_note_on(note, volume_to_velocity(volume)) {
            log::warn!("{}", err);
        }
    }
}

/// Nearest MIDI note to a frequency (A4 = 440 Hz = 69)
pub fn frequency_to_midi_note(frequency: f32) -> Option<u8> {
    if frequency <= 0.0 {
        return None;
    }
    let note = (69.0 + 12.0 * (frequency / 440.0).log2()).round();
    (0.0..=127.0).contains(&note).then_some(note as u8)
}

pub fn volume_to_velocity(volume: u8) -> u8 {
    (volume.min(100) as u16 * 127 / 100) as u8
}

pub fn midi_note_name(note: u8) -> String {
    let octave = (note / 12) as i32 - 1;
    format!("{}{}", PitchClass::from_semitone(note % 12), octave)
}
