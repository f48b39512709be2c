//! Desktop window
//!
//! Renders the pulsing circle, phase label, countdown, run controls and
//! the live waveform with egui. The orchestrator is ticked once per frame.

use crate::config::AppConfig;
use breathpacer_core::catalog::{self, PRESETS};
use breathpacer_core::{CycleError, CycleOrchestrator, Phase, Presenter, ToneSynthesizer};
use egui::{Align2, Color32, FontId, Stroke};
use egui_plot::{HLine, Line, Plot, PlotPoints};
use std::time::{Duration, Instant};

/// Frame interval requested while the window is open
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// How long the ring spawned by a phase change keeps expanding
const RIPPLE_DURATION: Duration = Duration::from_secs(2);

const WAVE_COLOR: Color32 = Color32::from_rgb(135, 206, 250);
const ERROR_COLOR: Color32 = Color32::from_rgb(229, 115, 115);

/// Which run controls are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    /// Start only
    #[default]
    Idle,
    /// Pause and Stop
    Running,
    /// Resume and Stop
    Paused,
}

/// Everything the window shows that the orchestrator pushes
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    pub phase: Option<Phase>,
    pub phase_total: Duration,
    pub countdown: Option<u64>,
    pub controls: ControlMode,
    /// Last start refusal, cleared by the next phase
    pub error: Option<String>,
    /// When the displayed phase last changed
    pub phase_changed_at: Option<Instant>,
}

impl DisplayState {
    pub fn phase_label(&self) -> &'static str {
        self.phase
            .map(Phase::label)
            .unwrap_or(catalog::REST_STYLE.label)
    }

    /// Countdown text: blank at zero, `--` when idle
    pub fn countdown_text(&self) -> String {
        match self.countdown {
            Some(0) => String::new(),
            Some(seconds) => seconds.to_string(),
            None => "--".to_string(),
        }
    }
}

impl Presenter for DisplayState {
    fn show_phase(&mut self, phase: Phase, total: Duration, _start_from: Duration) {
        if self.phase != Some(phase) {
            self.phase_changed_at = Some(Instant::now());
        }
        self.phase = Some(phase);
        self.phase_total = total;
        self.error = None;
    }

    fn show_countdown(&mut self, seconds: u64) {
        self.countdown = Some(seconds);
    }

    fn show_running(&mut self) {
        self.controls = ControlMode::Running;
    }

    fn show_paused(&mut self) {
        self.controls = ControlMode::Paused;
    }

    fn show_idle(&mut self) {
        self.controls = ControlMode::Idle;
        self.phase = None;
        self.countdown = None;
        self.phase_changed_at = None;
    }

    fn show_error(&mut self, error: &CycleError) {
        self.error = Some(error.to_string());
    }
}

/// Entry in the pattern selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Preset(usize),
    Custom,
}

/// The desktop application
pub struct BreathingApp {
    orchestrator: CycleOrchestrator<DisplayState>,
    selection: Selection,
    custom_text: String,
    custom_error: Option<String>,
    sound_enabled: bool,
}

impl BreathingApp {
    pub fn new(config: &AppConfig, synth: ToneSynthesizer) -> Self {
        let orchestrator = super::build_orchestrator(config, DisplayState::default(), synth);
        let pattern = orchestrator.pattern();

        let selection = PRESETS
            .iter()
            .position(|p| p.pattern == pattern)
            .map(Selection::Preset)
            .unwrap_or(Selection::Custom);
        let custom_text = match selection {
            Selection::Custom => pattern.describe(),
            Selection::Preset(_) => String::new(),
        };

        Self {
            orchestrator,
            selection,
            custom_text,
            custom_error: None,
            sound_enabled: config.sound_enabled,
        }
    }

    /// Open the window and block until it is closed
    pub fn run(config: &AppConfig, synth: ToneSynthesizer) -> anyhow::Result<()> {
        let app = Self::new(config, synth);
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title("Breathpacer")
                .with_inner_size([440.0, 680.0])
                .with_min_inner_size([360.0, 540.0]),
            ..Default::default()
        };

        tracing::info!("Opening breathing window");
        eframe::run_native(
            "Breathpacer",
            options,
            Box::new(move |_cc| Ok(Box::new(app))),
        )
        .map_err(|e| anyhow::anyhow!("Window failed: {}", e))
    }

    fn select(&mut self, selection: Selection) {
        self.selection = selection;
        match selection {
            Selection::Preset(index) => {
                if let Err(e) = self.orchestrator.select_pattern(index) {
                    tracing::warn!(error = %e, "Preset selection failed");
                }
                self.custom_error = None;
            }
            Selection::Custom if self.custom_text.trim().is_empty() => {}
            Selection::Custom => self.apply_custom_text(),
        }
    }

    fn apply_custom_text(&mut self) {
        self.custom_error = match self.orchestrator.submit_custom_pattern(&self.custom_text) {
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };
    }

    fn controls_ui(&mut self, ui: &mut egui::Ui, now: Instant) {
        ui.add_space(6.0);
        let selected_text = match self.selection {
            Selection::Preset(index) => PRESETS[index].name,
            Selection::Custom => "Custom",
        };

        let mut chosen = None;
        egui::ComboBox::from_label("Pattern")
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                for (index, preset) in PRESETS.iter().enumerate() {
                    let selection = Selection::Preset(index);
                    if ui
                        .selectable_label(self.selection == selection, preset.name)
                        .clicked()
                    {
                        chosen = Some(selection);
                    }
                }
                if ui
                    .selectable_label(self.selection == Selection::Custom, "Custom")
                    .clicked()
                {
                    chosen = Some(Selection::Custom);
                }
            });
        if let Some(selection) = chosen {
            self.select(selection);
        }

        match self.selection {
            Selection::Preset(index) => {
                ui.label(PRESETS[index].description);
            }
            Selection::Custom => {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.custom_text).hint_text("4-7-8"),
                );
                if response.changed() {
                    self.apply_custom_text();
                }
                ui.small("Format: inhale-hold-exhale-holdAfterExhale (use 0 to skip a phase)");
                if let Some(error) = &self.custom_error {
                    ui.colored_label(ERROR_COLOR, error);
                }
            }
        }

        ui.add_space(4.0);
        let controls = self.orchestrator.presenter().controls;
        ui.horizontal(|ui| {
            match controls {
                ControlMode::Idle => {
                    if ui.button("Start").clicked() {
                        if let Err(e) = self.orchestrator.start(now) {
                            tracing::debug!(error = %e, "Start refused");
                        }
                    }
                }
                ControlMode::Running => {
                    if ui.button("Pause").clicked() {
                        self.orchestrator.pause(now);
                    }
                    if ui.button("Stop").clicked() {
                        self.orchestrator.stop(now);
                    }
                }
                ControlMode::Paused => {
                    if ui.button("Resume").clicked() {
                        self.orchestrator.resume(now);
                    }
                    if ui.button("Stop").clicked() {
                        self.orchestrator.stop(now);
                    }
                }
            }

            ui.separator();
            if ui.checkbox(&mut self.sound_enabled, "Sound").changed() {
                self.orchestrator.set_sound_enabled(self.sound_enabled);
            }
        });

        if let Some(error) = &self.orchestrator.presenter().error {
            ui.colored_label(ERROR_COLOR, error);
        }
        ui.add_space(6.0);
    }

    fn circle_ui(&self, ui: &mut egui::Ui, now: Instant) {
        let display = self.orchestrator.presenter();
        let style = self.orchestrator.current_style();
        let scale = self.orchestrator.current_scale();
        let [r, g, b, a] = style.color;

        let (rect, _) = ui.allocate_exact_size(ui.available_size(), egui::Sense::hover());
        let painter = ui.painter_at(rect);
        let center = rect.center();
        // Leaves room for the largest target scale
        let base_radius = rect.width().min(rect.height()) * 0.25;
        let radius = base_radius * scale;

        let glow = (scale * 0.3).min(0.8);
        for (spread, strength) in [(0.35, 0.25), (0.2, 0.45)] {
            painter.circle_filled(
                center,
                radius * (1.0 + spread * glow),
                Color32::from_rgba_unmultiplied(r, g, b, (a as f32 * strength * glow) as u8),
            );
        }
        painter.circle_filled(center, radius, Color32::from_rgba_unmultiplied(r, g, b, a));
        painter.circle_stroke(
            center,
            radius,
            Stroke::new(3.0, Color32::from_rgba_unmultiplied(r, g, b, 230)),
        );

        if let Some(changed_at) = display.phase_changed_at {
            let t = now.saturating_duration_since(changed_at).as_secs_f32()
                / RIPPLE_DURATION.as_secs_f32();
            if t < 1.0 {
                let eased = breathpacer_core::easing::Easing::EaseOutCubic.apply(t);
                painter.circle_stroke(
                    center,
                    radius * (1.0 + eased * 0.5),
                    Stroke::new(
                        2.0,
                        Color32::from_rgba_unmultiplied(r, g, b, ((1.0 - t) * 200.0) as u8),
                    ),
                );
            }
        }

        painter.text(
            center - egui::vec2(0.0, 18.0),
            Align2::CENTER_CENTER,
            display.phase_label(),
            FontId::proportional(26.0),
            Color32::WHITE,
        );
        painter.text(
            center + egui::vec2(0.0, 20.0),
            Align2::CENTER_CENTER,
            display.countdown_text(),
            FontId::proportional(36.0),
            Color32::WHITE,
        );
    }

    fn waveform_ui(&self, ui: &mut egui::Ui) {
        let waveform = self.orchestrator.waveform();
        let span = waveform.amplitude() as f64 * 1.2;
        let points: PlotPoints = waveform.points().into();

        Plot::new("breath_waveform")
            .height(130.0)
            .show_axes(false)
            .show_grid(false)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .include_x(0.0)
            .include_x(waveform.max_points() as f64)
            .include_y(-span)
            .include_y(span)
            .show(ui, |plot_ui| {
                plot_ui.hline(
                    HLine::new(waveform.baseline() as f64)
                        .color(WAVE_COLOR.gamma_multiply(0.2))
                        .width(1.0),
                );
                plot_ui.line(
                    Line::new(points)
                        .color(WAVE_COLOR.gamma_multiply(0.9))
                        .width(3.0)
                        .fill(-span as f32),
                );
            });
    }
}

impl eframe::App for BreathingApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.orchestrator.tick(now);

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            self.controls_ui(ui, now);
        });
        egui::TopBottomPanel::bottom("waveform").show(ctx, |ui| {
            self.waveform_ui(ui);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.circle_ui(ui, now);
        });

        ctx.request_repaint_after(FRAME_INTERVAL);
    }
}
