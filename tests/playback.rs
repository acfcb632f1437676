use std::thread;
use std::time::Duration;

use steptrack::sequencer::tempo_to_interval;
use steptrack::{
    Editor, PitchClass, PlaybackEngine, PlaybackEvent, Sequencer, SequencerConfig, ToneEvent,
};

fn steps_advanced(events: &[PlaybackEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::StepAdvanced(step) => Some(*step),
            PlaybackEvent::Tone(_) => None,
        })
        .collect()
}

#[test]
fn ticks_immediately_then_every_half_second_at_120_bpm() {
    let config = SequencerConfig::default();
    assert_eq!((config.grid_size, config.max_tracks), (16, 8));

    let mut seq = Sequencer::new(&config);
    seq.add_track();
    assert_eq!(seq.tempo(), 120);
    assert_eq!(tempo_to_interval(seq.tempo()), Duration::from_millis(500));

    let mut engine = PlaybackEngine::new(seq, Vec::<ToneEvent>::new());
    engine.play();
    assert_eq!(steps_advanced(&engine.poll_events()), vec![0]);

    thread::sleep(Duration::from_millis(250));
    assert!(steps_advanced(&engine.poll_events()).is_empty());

    thread::sleep(Duration::from_millis(500));
    assert_eq!(steps_advanced(&engine.poll_events()), vec![1]);

    engine.stop();
    assert_eq!(engine.sequencer().cursor(), 0);
}

#[test]
fn clocked_cycle_wraps_and_only_sounds_notes() {
    let config = SequencerConfig {
        grid_size: 4,
        initial_tempo: 300,
        ..SequencerConfig::default()
    };
    let mut seq = Sequencer::new(&config);
    seq.add_track();
    seq.add_track();
    seq.open_editor(Editor::NoteEntry { track: 1, offset: 2 }).unwrap();
    seq.insert_note(PitchClass::E).unwrap();

    let mut engine = PlaybackEngine::new(seq, Vec::<ToneEvent>::new());
    engine.play();
    // 200ms steps: the fifth tick is due at 800ms, leaving wide slack
    thread::sleep(Duration::from_millis(1300));
    engine.pause();

    let steps = steps_advanced(&engine.poll_events());
    assert!(steps.len() >= 5, "steps: {:?}", steps);
    assert_eq!(&steps[..5], &[0, 1, 2, 3, 0]);
    assert!(steps.iter().all(|s| *s < 4));

    let sounded = steps.iter().filter(|s| **s == 2).count();
    assert_eq!(engine.output().len(), sounded);
    assert!(engine.output().iter().all(|t| t.volume == 80));

    let cursor = engine.sequencer().cursor();
    assert_eq!(cursor, (steps[steps.len() - 1] + 1) % 4);
}

#[test]
fn edits_during_playback_land_on_next_read() {
    let config = SequencerConfig {
        grid_size: 2,
        initial_tempo: 60,
        ..SequencerConfig::default()
    };
    let mut seq = Sequencer::new(&config);
    seq.add_track();

    let mut engine = PlaybackEngine::new(seq, Vec::<ToneEvent>::new());
    engine.play();
    assert!(engine.output().is_empty());

    {
        let mut seq = engine.sequencer();
        seq.open_editor(Editor::NoteEntry { track: 0, offset: 0 }).unwrap();
        seq.insert_note(PitchClass::C).unwrap();
    }
    engine.pause();
    assert!(engine.output().is_empty());

    engine.play();
    engine.play();
    assert_eq!(engine.output().len(), 1);
    engine.stop();
}
