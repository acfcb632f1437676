/// Transport clock - turns a tempo into a repeating tick
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Step interval in milliseconds, one step per beat
pub fn tempo_to_interval_ms(bpm: u32) -> f64 {
    60_000.0 / bpm.max(1) as f64
}

pub fn tempo_to_interval(bpm: u32) -> Duration {
    Duration::from_secs_f64(tempo_to_interval_ms(bpm) / 1000.0)
}

/// Deadline after `scheduled`. A late timer re-anchors on `now` so missed
/// steps are dropped instead of fired back to back.
fn next_deadline(scheduled: Instant, interval: Duration, now: Instant) -> Instant {
    (scheduled + interval).max(now)
}

struct Timer {
    cancel: Sender<()>,
    thread: JoinHandle<()>,
    interval: Duration,
}

/// Owns the single repeating timer that drives playback
#[derive(Default)]
pub struct Transport {
    timer: Option<Timer>,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts ticking at the tempo's interval, replacing any running timer.
    ///
    /// `on_tick` runs once on the calling thread before this returns, then on
    /// the timer thread every interval until [`Transport::stop`]. The interval
    /// is fixed for the lifetime of the timer; tempo changes need a restart.
    pub fn start<F>(&mut self, bpm: u32, mut on_tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.stop();

        let interval = tempo_to_interval(bpm);
        on_tick();

        let (cancel, cancelled) = channel::<()>();
        let thread = thread::spawn(move || {
            let mut next = Instant::now() + interval;
            loop {
                let wait = next.saturating_duration_since(Instant::now());
                match cancelled.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {
                        on_tick();
                        next = next_deadline(next, interval, Instant::now());
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        log::debug!("clock started at {} bpm ({:?} per step)", bpm, interval);
        self.timer = Some(Timer {
            cancel,
            thread,
            interval,
        });
    }

    /// Cancels the timer and waits for its thread to finish. Safe to call
    /// when nothing is running. Must not be called while holding a lock the
    /// tick callback takes.
    pub fn stop(&mut self) {
        let Some(timer) = self.timer.take() else {
            return;
        };

        let _ = timer.cancel.send(());
        if timer.thread.join().is_err() {
            log::error!("clock thread panicked");
        }
        log::debug!("clock stopped");
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Interval of the running timer
    pub fn interval(&self) -> Option<Duration> {
        self.timer.as_ref().map(|t| t.interval)
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.stop();
    }
}
