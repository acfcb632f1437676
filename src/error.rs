/// Error types for the sequencer core and its output devices

/// Editing and command errors raised by the sequencer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequencerError {
    #[error("no editor is open")]
    NoEditorOpen,

    #[error("the open editor is not a {expected} editor")]
    WrongEditor { expected: &'static str },

    #[error("track index {index} out of range ({len} tracks)")]
    TrackOutOfRange { index: usize, len: usize },

    #[error("step offset {offset} out of range (grid size {grid_size})")]
    StepOutOfRange { offset: usize, grid_size: usize },

    #[error("unknown pitch label: {0:?}")]
    UnknownPitch(String),

    #[error("unknown timbre: {0:?}")]
    UnknownTimbre(String),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Audio device errors
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no default output device")]
    NoDevice,

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("output config error: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("failed to start stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

/// MIDI output errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MidiError {
    #[error("failed to create MIDI output: {0}")]
    Init(String),

    #[error("invalid port index {0}")]
    InvalidPort(usize),

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("failed to send {kind}: {message}")]
    Send { kind: &'static str, message: String },
}

pub type Result<T, E = SequencerError> = std::result::Result<T, E>;
