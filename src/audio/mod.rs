/// Audio output using cpal
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::f32::consts::PI;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::AudioError;
use crate::sequencer::Timbre;

/// Receives the tones the sequencer fires. Fire-and-forget: the sequencer
/// never waits on or tracks what happens to a triggered tone.
pub trait ToneTrigger {
    fn trigger(&mut self, timbre: Timbre, volume: u8, frequency: f32);
}

impl<T: ToneTrigger + ?Sized> ToneTrigger for &mut T {
    fn trigger(&mut self, timbre: Timbre, volume: u8, frequency: f32) {
        (**self).trigger(timbre, volume, frequency)
    }
}

impl<T: ToneTrigger + ?Sized> ToneTrigger for Box<T> {
    fn trigger(&mut self, timbre: Timbre, volume: u8, frequency: f32) {
        (**self).trigger(timbre, volume, frequency)
    }
}

/// One triggered tone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneEvent {
    pub timbre: Timbre,
    pub volume: u8,
    pub frequency: f32,
}

/// Records every tone, for forwarding and tests
impl ToneTrigger for Vec<ToneEvent> {
    fn trigger(&mut self, timbre: Timbre, volume: u8, frequency: f32) {
        self.push(ToneEvent {
            timbre,
            volume,
            frequency,
        });
    }
}

/// Length of a triggered tone
const TONE_SECONDS: f32 = 0.25;
/// Output gain at full volume, leaves headroom for a full chord of tracks
const MASTER_GAIN: f32 = 0.15;

/// One sample of a waveform at `phase` in [0, 1)
pub fn waveform(timbre: Timbre, phase: f32) -> f32 {
    match timbre {
        Timbre::Sine => (phase * 2.0 * PI).sin(),
        Timbre::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Timbre::Sawtooth => 2.0 * phase - 1.0,
        Timbre::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
    }
}

#[derive(Debug, Clone)]
struct Voice {
    timbre: Timbre,
    phase_increment: f32,
    phase: f32,
    gain: f32,
    remaining: u32,
    length: u32,
}

impl Voice {
    fn next_sample(&mut self) -> f32 {
        let envelope = self.remaining as f32 / self.length as f32;
        let sample = waveform(self.timbre, self.phase) * self.gain * envelope;
        self.phase += self.phase_increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.remaining = self.remaining.saturating_sub(1);
        sample
    }
}

#[derive(Debug, Default)]
struct Voices {
    sample_rate: f32,
    active: Vec<Voice>,
}

impl Voices {
    fn start(&mut self, timbre: Timbre, volume: u8, frequency: f32) {
        if self.sample_rate <= 0.0 {
            return;
        }
        let length = ((self.sample_rate * TONE_SECONDS) as u32).max(1);
        self.active.push(Voice {
            timbre,
            phase_increment: frequency / self.sample_rate,
            phase: 0.0,
            gain: volume as f32 / 100.0 * MASTER_GAIN,
            remaining: length,
            length,
        });
    }

    fn render(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_mut(channels.max(1)) {
            let value: f32 = self.active.iter_mut().map(Voice::next_sample).sum();
            for sample in frame {
                *sample = value;
            }
        }
        self.active.retain(|v| v.remaining > 0);
    }
}

/// Handle for triggering tones from any thread
#[derive(Debug, Clone)]
pub struct AudioTrigger {
    voices: Arc<Mutex<Voices>>,
}

impl ToneTrigger for AudioTrigger {
    fn trigger(&mut self, timbre: Timbre, volume: u8, frequency: f32) {
        self.voices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .start(timbre, volume, frequency);
    }
}

/// Owns the output stream. The stream stays on the thread that created it;
/// hand [`AudioOutput::trigger_handle`] to whoever fires tones.
pub struct AudioOutput {
    _stream: Option<cpal::Stream>,
    voices: Arc<Mutex<Voices>>,
}

impl AudioOutput {
    pub fn new() -> Result<Self, AudioError> {
        let voices = Arc::new(Mutex::new(Voices::default()));
        let stream = Self::setup_audio_stream(Arc::clone(&voices))?;

        Ok(Self {
            _stream: Some(stream),
            voices,
        })
    }

    /// An output with no device, tones are dropped
    pub fn silent() -> Self {
        Self {
            _stream: None,
            voices: Arc::new(Mutex::new(Voices::default())),
        }
    }

    fn setup_audio_stream(voices: Arc<Mutex<Voices>>) -> Result<cpal::Stream, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let config = device.default_output_config()?;

        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(AudioError::UnsupportedFormat(format!(
                "{:?}",
                config.sample_format()
            )));
        }

        let channels = config.channels() as usize;
        voices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sample_rate = config.sample_rate().0 as f32;

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                voices
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .render(data, channels);
            },
            |err| log::error!("audio stream error: {}", err),
            None,
        )?;
        stream.play()?;

        log::info!("audio output started on {} channel(s)", channels);
        Ok(stream)
    }

    pub fn is_active(&self) -> bool {
        self._stream.is_some()
    }

    pub fn trigger_handle(&self) -> AudioTrigger {
        AudioTrigger {
            voices: Arc::clone(&self.voices),
        }
    }
}

impl Default for AudioOutput {
    fn default() -> Self {
        Self::new().unwrap_or_else(|err| {
            log::warn!("audio disabled: {}", err);
            Self::silent()
        })
    }
}
