#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use steptrack::{
    sequencer::{MAX_TEMPO, MIN_TEMPO, VOLUME_STEP},
    AudioOutput, AudioTrigger, Color, Editor, MidiOutputDevice, Pitch, PitchClass, PlaybackEngine,
    PlaybackEvent, Sequencer, SequencerConfig, SequencerError, Timbre, ToneEvent, ToneTrigger,
    TransportState,
};

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    // optional RON config path as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => SequencerConfig::load(&path).unwrap_or_else(|err| {
            eprintln!("{}: {}, using defaults", path, err);
            SequencerConfig::default()
        }),
        None => SequencerConfig::default(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 600.0])
            .with_title("steptrack"),
        ..Default::default()
    };

    eframe::run_native(
        "steptrack",
        options,
        Box::new(move |_cc| Ok(Box::new(TrackerApp::new(&config)))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
enum LaneAction {
    OpenOptions(usize),
    OpenNoteEntry(usize, usize),
    RemoveNote(usize, usize),
    AdjustVolume(usize, usize, i32),
    Delete(usize),
}

#[cfg(feature = "gui")]
#[derive(Default)]
struct NoteEntryInput {
    pitch: Option<Pitch>,
    octave_delta: i32,
    volume_delta: i32,
    clear: bool,
    close: bool,
}

#[cfg(feature = "gui")]
fn apply_note_entry(
    seq: &mut Sequencer,
    track: usize,
    offset: usize,
    input: &NoteEntryInput,
) -> Result<(), SequencerError> {
    if input.octave_delta != 0 {
        seq.change_octave(input.octave_delta)?;
    }
    if input.volume_delta != 0 {
        seq.adjust_volume(track, offset, input.volume_delta)?;
    }
    if input.clear {
        seq.remove_note(track, offset)?;
        seq.close_editor();
    } else if let Some(pitch) = input.pitch {
        seq.insert_note(pitch)?;
    }
    if input.close {
        seq.close_editor();
    }
    Ok(())
}

#[cfg(feature = "gui")]
struct TrackerApp {
    engine: PlaybackEngine<AudioTrigger>,
    audio_output: AudioOutput,
    midi_output: MidiOutputDevice,

    // UI state
    available_midi_ports: Vec<String>,
    selected_port: Option<usize>,
    current_visual_step: Option<usize>,
    pending_tones: Vec<ToneEvent>,
    last_error: Option<String>,
}

#[cfg(feature = "gui")]
impl TrackerApp {
    fn new(config: &SequencerConfig) -> Self {
        let audio_output = AudioOutput::default();
        let mut sequencer = Sequencer::new(config);
        sequencer.add_track();

        Self {
            engine: PlaybackEngine::new(sequencer, audio_output.trigger_handle()),
            audio_output,
            midi_output: MidiOutputDevice::new(),
            available_midi_ports: MidiOutputDevice::available_ports(),
            selected_port: None,
            current_visual_step: None,
            pending_tones: Vec::new(),
            last_error: None,
        }
    }

    /// Forwards the tones of each played step to MIDI, releasing the
    /// previous step's notes first
    fn handle_playback_events(&mut self) {
        for event in self.engine.poll_events() {
            match event {
                PlaybackEvent::Tone(tone) => self.pending_tones.push(tone),
                PlaybackEvent::StepAdvanced(step) => {
                    self.current_visual_step = Some(step);
                    self.midi_output.release_all();
                    for tone in self.pending_tones.drain(..) {
                        self.midi_output
                            .trigger(tone.timbre, tone.volume, tone.frequency);
                    }
                }
            }
        }
    }

    fn report(&mut self, result: Result<(), SequencerError>) {
        if let Err(err) = result {
            self.last_error = Some(err.to_string());
        }
    }

    fn stop_playback(&mut self) {
        self.engine.stop();
        self.midi_output.release_all();
        self.current_visual_step = None;
    }

    fn midi_port_row(&mut self, ui: &mut egui::Ui) {
        let mut selected_port_changed = None;
        ui.horizontal(|ui| {
            ui.label("MIDI Output:");
            if self.available_midi_ports.is_empty() {
                ui.label("No MIDI ports available");
            } else {
                egui::ComboBox::from_label("")
                    .selected_text(
                        self.selected_port
                            .and_then(|i| self.available_midi_ports.get(i))
                            .map(String::as_str)
                            .unwrap_or("Select port..."),
                    )
                    .show_ui(ui, |ui| {
                        for (i, port_name) in self.available_midi_ports.iter().enumerate() {
                            if ui
                                .selectable_label(self.selected_port == Some(i), port_name.as_str())
                                .clicked()
                            {
                                selected_port_changed = Some(i);
                            }
                        }
                    });
            }
        });

        if let Some(port_idx) = selected_port_changed {
            self.midi_output.disconnect();
            self.selected_port = None;
            match self.midi_output.connect(port_idx) {
                Ok(()) => self.selected_port = Some(port_idx),
                Err(err) => self.last_error = Some(err.to_string()),
            }
        }
    }

    fn transport_row(&mut self, ui: &mut egui::Ui) {
        let (state, tempo, track_count, max_tracks) = {
            let seq = self.engine.sequencer();
            (seq.state(), seq.tempo(), seq.tracks().len(), seq.max_tracks())
        };

        ui.horizontal(|ui| {
            if state == TransportState::Playing {
                if ui.button("⏸ Pause").clicked() {
                    self.engine.pause();
                    self.midi_output.release_all();
                }
            } else if ui.button("▶ Play").clicked() {
                self.engine.play();
            }
            if ui.button("⏹ Stop").clicked() {
                self.stop_playback();
            }

            ui.add_space(20.0);

            ui.label("BPM:");
            let mut bpm = tempo as i64;
            if ui
                .add(egui::Slider::new(&mut bpm, MIN_TEMPO as i64..=MAX_TEMPO as i64))
                .changed()
            {
                // takes effect on the next play
                self.engine.sequencer().set_tempo(bpm);
            }

            ui.add_space(20.0);

            if ui
                .add_enabled(track_count < max_tracks, egui::Button::new("+ Track"))
                .clicked()
            {
                self.engine.sequencer().add_track();
            }
            ui.label(format!("{}/{} tracks", track_count, max_tracks));
        });
    }

    fn track_lanes(&mut self, ui: &mut egui::Ui) {
        let tracks = self.engine.sequencer().tracks().to_vec();
        let mut actions = Vec::new();

        for (index, track) in tracks.iter().enumerate() {
            ui.horizontal(|ui| {
                let [r, g, b] = track.color.0;
                let name_button = egui::Button::new(
                    egui::RichText::new(track.name.as_str()).color(egui::Color32::WHITE),
                )
                .fill(egui::Color32::from_rgb(r, g, b))
                .min_size(egui::vec2(110.0, 44.0));
                let hover = format!("{}, {} notes", track.timbre.name(), track.sounding_steps());
                if ui.add(name_button).on_hover_text(hover).clicked() {
                    actions.push(LaneAction::OpenOptions(index));
                }

                for (offset, note) in track.steps().iter().enumerate() {
                    let is_current = self.current_visual_step == Some(offset);
                    let text = if note.is_sounding() {
                        format!("{}\n{}", note, note.volume)
                    } else {
                        format!("{}\n ", note)
                    };

                    let button = egui::Button::new(text)
                        .min_size(egui::vec2(44.0, 44.0))
                        .fill(if is_current {
                            egui::Color32::from_rgb(100, 200, 100)
                        } else if note.is_sounding() {
                            egui::Color32::from_rgb(60, 60, 200)
                        } else {
                            egui::Color32::from_rgb(40, 40, 40)
                        });

                    let response = ui
                        .add(button)
                        .on_hover_text("Click: enter note, right click: clear, scroll: volume");
                    if response.clicked() {
                        actions.push(LaneAction::OpenNoteEntry(index, offset));
                    }
                    if response.secondary_clicked() {
                        actions.push(LaneAction::RemoveNote(index, offset));
                    }
                    if response.hovered() {
                        let scroll = ui.input(|i| i.raw_scroll_delta.y);
                        if scroll > 0.0 {
                            actions.push(LaneAction::AdjustVolume(index, offset, VOLUME_STEP));
                        } else if scroll < 0.0 {
                            actions.push(LaneAction::AdjustVolume(index, offset, -VOLUME_STEP));
                        }
                    }
                }

                if ui.button("🗑").on_hover_text("Delete track").clicked() {
                    actions.push(LaneAction::Delete(index));
                }
            });
        }

        for action in actions {
            let mut seq = self.engine.sequencer();
            let result = match action {
                LaneAction::OpenOptions(track) => seq.open_editor(Editor::TrackOptions { track }),
                LaneAction::OpenNoteEntry(track, offset) => {
                    seq.open_editor(Editor::NoteEntry { track, offset })
                }
                LaneAction::RemoveNote(track, offset) => seq.remove_note(track, offset),
                LaneAction::AdjustVolume(track, offset, delta) => {
                    seq.adjust_volume(track, offset, delta)
                }
                LaneAction::Delete(track) => seq.delete_track(track).map(|_| ()),
            };
            drop(seq);
            self.report(result);
        }
    }

    fn track_options_window(&mut self, ctx: &egui::Context, track: usize) {
        let Some(current) = self.engine.sequencer().track(track).cloned() else {
            return;
        };

        let mut name = current.name.clone();
        let mut color = current.color.0;
        let mut timbre = current.timbre;
        let mut open = true;

        egui::Window::new(format!("{} options", current.name))
            .id(egui::Id::new("track_options"))
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Name:");
                    ui.text_edit_singleline(&mut name);
                });
                ui.horizontal(|ui| {
                    ui.label("Color:");
                    ui.color_edit_button_srgb(&mut color);
                });
                egui::ComboBox::from_label("Timbre")
                    .selected_text(timbre.name())
                    .show_ui(ui, |ui| {
                        for option in Timbre::ALL {
                            ui.selectable_value(&mut timbre, option, option.name());
                        }
                    });
            });

        let result = {
            let mut seq = self.engine.sequencer();
            let mut result = Ok(());
            if name != current.name {
                result = result.and(seq.set_track_name(name));
            }
            if color != current.color.0 {
                result = result.and(seq.set_track_color(Color(color)));
            }
            if timbre != current.timbre {
                result = result.and(seq.set_track_timbre(timbre));
            }
            if !open {
                seq.close_editor();
            }
            result
        };
        self.report(result);
    }

    fn note_entry_window(&mut self, ctx: &egui::Context, track: usize, offset: usize) {
        let Some(note) = self
            .engine
            .sequencer()
            .track(track)
            .and_then(|t| t.get(offset))
            .copied()
        else {
            return;
        };

        let mut input = NoteEntryInput::default();
        let mut open = true;

        egui::Window::new(format!("Track {} step {}: {}", track + 1, offset + 1, note))
            .id(egui::Id::new("note_entry"))
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    for pc in PitchClass::ALL {
                        let (fill, text_color) = if pc.is_sharp() {
                            (egui::Color32::from_rgb(30, 30, 30), egui::Color32::WHITE)
                        } else {
                            (egui::Color32::from_rgb(230, 230, 230), egui::Color32::BLACK)
                        };
                        let key = egui::Button::new(egui::RichText::new(pc.label()).color(text_color))
                            .fill(fill)
                            .min_size(egui::vec2(36.0, 90.0));
                        if ui.add(key).clicked() {
                            input.pitch = Some(Pitch::Class(pc));
                        }
                    }
                    if ui.button("Off").clicked() {
                        input.pitch = Some(Pitch::Off);
                    }
                });

                ui.horizontal(|ui| {
                    if ui.button("Octave -").clicked() {
                        input.octave_delta = -1;
                    }
                    ui.label(format!("Octave {}", note.octave));
                    if ui.button("Octave +").clicked() {
                        input.octave_delta = 1;
                    }

                    ui.add_space(20.0);

                    if ui.button("Vol -").clicked() {
                        input.volume_delta = -VOLUME_STEP;
                    }
                    ui.label(format!("Volume {}", note.volume));
                    if ui.button("Vol +").clicked() {
                        input.volume_delta = VOLUME_STEP;
                    }

                    ui.add_space(20.0);

                    if ui.button("Clear").clicked() {
                        input.clear = true;
                    }
                });
            });

        input.close = !open;
        let result = apply_note_entry(&mut self.engine.sequencer(), track, offset, &input);
        self.report(result);
    }
}

#[cfg(feature = "gui")]
impl eframe::App for TrackerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        self.handle_playback_events();

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.engine.sequencer().close_editor();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("steptrack");
            ui.add_space(10.0);

            self.midi_port_row(ui);
            ui.add_space(10.0);

            self.transport_row(ui);
            ui.add_space(20.0);

            egui::ScrollArea::horizontal().show(ui, |ui| {
                self.track_lanes(ui);
            });

            ui.separator();
            ui.label("Click a track name for options, a step to enter a note");
            if !self.audio_output.is_active() {
                ui.colored_label(
                    egui::Color32::YELLOW,
                    "⚠ No audio device - tones are not played locally",
                );
            }
            if !self.midi_output.is_connected() {
                ui.colored_label(
                    egui::Color32::YELLOW,
                    "⚠ No MIDI output connected - audio playback only",
                );
            }
            if let Some(err) = &self.last_error {
                ui.colored_label(egui::Color32::LIGHT_RED, err.as_str());
            }
        });

        let editor = self.engine.sequencer().editor();
        match editor {
            Some(Editor::TrackOptions { track }) => self.track_options_window(ctx, track),
            Some(Editor::NoteEntry { track, offset }) => {
                self.note_entry_window(ctx, track, offset)
            }
            None => {}
        }
    }
}
