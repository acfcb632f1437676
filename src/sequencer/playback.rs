/// Playback engine - coordinates the clock, the sequencer and tone output
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::transport::Transport;
use super::Sequencer;
use crate::audio::{ToneEvent, ToneTrigger};

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// A step was played; carries the step index
    StepAdvanced(usize),
    Tone(ToneEvent),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One tick body. The sequencer stays locked until every tone of the step has
/// been handed to the output, so ticks and edits never interleave.
fn run_tick<T: ToneTrigger>(
    sequencer: &Mutex<Sequencer>,
    output: &Mutex<T>,
    events: &Sender<PlaybackEvent>,
) {
    let mut seq = lock(sequencer);
    let mut fired: Vec<ToneEvent> = Vec::new();
    let Some(step) = seq.tick(&mut fired) else {
        return;
    };

    let mut out = lock(output);
    for tone in fired {
        out.trigger(tone.timbre, tone.volume, tone.frequency);
        let _ = events.send(PlaybackEvent::Tone(tone));
    }
    let _ = events.send(PlaybackEvent::StepAdvanced(step));
}

pub struct PlaybackEngine<T> {
    sequencer: Arc<Mutex<Sequencer>>,
    output: Arc<Mutex<T>>,
    transport: Transport,
    sender: Sender<PlaybackEvent>,
    receiver: Receiver<PlaybackEvent>,
}

impl<T: ToneTrigger + Send + 'static> PlaybackEngine<T> {
    pub fn new(sequencer: Sequencer, output: T) -> Self {
        let (sender, receiver) = channel();

        Self {
            sequencer: Arc::new(Mutex::new(sequencer)),
            output: Arc::new(Mutex::new(output)),
            transport: Transport::new(),
            sender,
            receiver,
        }
    }

    /// Starts (or restarts) playback from the current cursor. The first step
    /// sounds before this returns; the clock runs at the tempo set now.
    pub fn play(&mut self) {
        let tempo = {
            let mut seq = lock(&self.sequencer);
            seq.play();
            seq.tempo()
        };

        let sequencer = Arc::clone(&self.sequencer);
        let output = Arc::clone(&self.output);
        let sender = self.sender.clone();
        self.transport
            .start(tempo, move || run_tick(&sequencer, &output, &sender));
    }

    pub fn pause(&mut self) {
        lock(&self.sequencer).pause();
        self.transport.stop();
    }

    pub fn stop(&mut self) {
        lock(&self.sequencer).stop();
        self.transport.stop();
    }

    pub fn is_running(&self) -> bool {
        self.transport.is_running()
    }

    /// Locks the sequencer for reading or editing. Edits land on the next
    /// tick that reads the edited step. Do not hold the guard across
    /// `play`, `pause` or `stop`.
    ///
    /// Transport changes go through the engine only, so the clock always
    /// follows the playing state:
    ///
    /// ```compile_fail
    /// use steptrack::{PlaybackEngine, Sequencer, ToneEvent};
    ///
    /// let mut engine = PlaybackEngine::new(Sequencer::default(), Vec::<ToneEvent>::new());
    /// engine.play();
    /// engine.sequencer().stop();
    /// ```
    pub fn sequencer(&self) -> MutexGuard<'_, Sequencer> {
        lock(&self.sequencer)
    }

    pub fn output(&self) -> MutexGuard<'_, T> {
        lock(&self.output)
    }

    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        self.receiver.try_iter().collect()
    }
}
