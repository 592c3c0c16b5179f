// src/gui.rs
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Instant;

use eframe::egui;
use egui::{Color32, RichText, Vec2};
use egui_plot::{HLine, Line, Plot, PlotPoints};

use crate::config::AppConfig;
use crate::display::indicator::{OVER_DEVIATION_HZ, UNDER_DEVIATION_HZ};
use crate::display::{DeviationBand, Rgb, SegmentFrame};
use crate::engine;
use crate::types::{MonitorCommand, MonitorMessage, Reading};

const HISTORY_LEN: usize = 600;
const LOG_LEN: usize = 12;

pub struct MonitorApp {
    // engine state mirrored from messages
    source_active: bool,
    is_recording: bool,
    overruns: u64,
    latest: Option<Reading>,

    // view state
    started: Instant,
    history: VecDeque<[f64; 2]>,
    alternate_scale: bool,
    record_path: String,
    log_messages: VecDeque<String>,

    rx: Receiver<MonitorMessage>,
    tx_cmd: Sender<MonitorCommand>,
    engine: Option<JoinHandle<()>>,
}

impl MonitorApp {
    pub fn new(config: AppConfig) -> Self {
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let alternate_scale = config.alternate_scale;
        let record_path = config
            .recording
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "deviation.csv".to_owned());

        let engine = engine::spawn_thread(config, tx, rx_cmd);

        Self {
            source_active: false,
            is_recording: false,
            overruns: 0,
            latest: None,
            started: Instant::now(),
            history: VecDeque::with_capacity(HISTORY_LEN),
            alternate_scale,
            record_path,
            log_messages: VecDeque::from(vec!["Deviation monitor starting...".to_owned()]),
            rx,
            tx_cmd,
            engine: Some(engine),
        }
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push_back(format!("> {msg}"));
        if self.log_messages.len() > LOG_LEN {
            self.log_messages.pop_front();
        }
    }

    fn send(&mut self, cmd: MonitorCommand) {
        if self.tx_cmd.send(cmd).is_err() {
            self.log("Engine is not running.");
        }
    }

    fn drain_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                MonitorMessage::Log(s) => self.log(&s),
                MonitorMessage::SourceStatus(b) => self.source_active = b,
                MonitorMessage::RecordingStatus(b) => self.is_recording = b,
                MonitorMessage::Overruns(n) => self.overruns = n,
                MonitorMessage::Reading(reading) => {
                    let t = self.started.elapsed().as_secs_f64();
                    self.history.push_back([t, f64::from(reading.value.max_deviation)]);
                    if self.history.len() > HISTORY_LEN {
                        self.history.pop_front();
                    }
                    self.latest = Some(reading);
                }
            }
        }
    }

    // Same layout as the OLED: header, big deviation value, then the DC average.
    fn draw_readout(&self, ui: &mut egui::Ui) {
        let (dev, dc) = match &self.latest {
            Some(reading) => {
                let line = SegmentFrame::from_value(&reading.value).to_line();
                let (dev, dc) = line.split_at(5);
                (dev.to_owned(), dc.trim().to_owned())
            }
            None => ("-.---".to_owned(), "-.--".to_owned()),
        };
        ui.vertical_centered(|ui| {
            ui.label(RichText::new("Deviation:").size(16.0));
            ui.horizontal(|ui| {
                ui.label(RichText::new(dev).size(48.0).monospace().strong());
                ui.label(RichText::new("kHz").size(24.0));
            });
            ui.add_space(8.0);
            ui.label(RichText::new("Average:").size(16.0));
            ui.horizontal(|ui| {
                ui.label(RichText::new(dc).size(24.0).monospace());
                ui.label(RichText::new("VDC").size(16.0));
            });
        });
    }

    fn draw_indicator(&self, ui: &mut egui::Ui) {
        let band = self
            .latest
            .map(|reading| DeviationBand::classify(reading.value.max_deviation));
        let Rgb(r, g, b) = band.map(DeviationBand::color).unwrap_or(Rgb(0, 0, 0));
        // The LED is driven dim; brighten for the screen.
        let fill = Color32::from_rgb(r.saturating_mul(10), g.saturating_mul(10), b.saturating_mul(10));
        ui.horizontal(|ui| {
            let (response, painter) = ui.allocate_painter(Vec2::splat(28.0), egui::Sense::hover());
            painter.circle_filled(response.rect.center(), 12.0, fill);
            painter.circle_stroke(response.rect.center(), 12.0, egui::Stroke::new(1.0, Color32::GRAY));
            ui.label(band.map_or("waiting for data", DeviationBand::label));
        });
    }
}

impl eframe::App for MonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. Engine messages
        self.drain_messages();

        // 2. Panels
        egui::SidePanel::left("controls").min_width(260.0).show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("FM Deviation Monitor");
            let status = if self.source_active {
                RichText::new("Source: running").color(Color32::GREEN)
            } else {
                RichText::new("Source: stopped").color(Color32::GRAY)
            };
            ui.label(status);
            ui.separator();

            self.draw_readout(ui);
            ui.add_space(10.0);
            self.draw_indicator(ui);
            ui.separator();

            if ui.checkbox(&mut self.alternate_scale, "Alternate scale").changed() {
                let alternate = self.alternate_scale;
                self.send(MonitorCommand::SetAlternateScale(alternate));
            }
            if let Some(reading) = &self.latest {
                ui.label(format!("Scale in use: {}", reading.scale.label()));
                let d = reading.diagnostics;
                ui.monospace(format!("adc {}..{}  wf {}", d.raw_min, d.raw_max, d.waveform_count));
                ui.monospace(format!("Vpp {:.4}  windows {}", d.peak_to_peak_volts, d.windows_published));
            }
            ui.label(format!("Overwritten windows: {}", self.overruns));
            ui.separator();

            ui.label("RECORDING");
            ui.add_enabled(!self.is_recording, egui::TextEdit::singleline(&mut self.record_path));
            let (text, fill) = if self.is_recording {
                ("Stop", Color32::RED)
            } else {
                ("Record", Color32::DARK_GRAY)
            };
            if ui
                .add(egui::Button::new(RichText::new(text).color(Color32::WHITE)).fill(fill))
                .clicked()
            {
                let cmd = if self.is_recording {
                    MonitorCommand::StopRecording
                } else {
                    MonitorCommand::StartRecording(PathBuf::from(self.record_path.trim()))
                };
                self.send(cmd);
            }

            ui.add_space(10.0);
            egui::ScrollArea::vertical().max_height(160.0).show(ui, |ui| {
                for m in &self.log_messages {
                    ui.monospace(m);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.label("Max deviation (kHz)");
            Plot::new("deviation_history")
                .view_aspect(2.0)
                .include_y(0.0)
                .include_y(4.0)
                .auto_bounds_x()
                .show(ui, |plot_ui| {
                    let over = f64::from(OVER_DEVIATION_HZ) / 1000.0;
                    let under = f64::from(UNDER_DEVIATION_HZ) / 1000.0;
                    plot_ui.hline(HLine::new(over).name("over").color(Color32::RED));
                    plot_ui.hline(HLine::new(under).name("under").color(Color32::LIGHT_BLUE));
                    if !self.history.is_empty() {
                        let points: Vec<[f64; 2]> = self.history.iter().copied().collect();
                        plot_ui.line(
                            Line::new(PlotPoints::new(points))
                                .name("max deviation")
                                .color(Color32::from_rgb(0, 255, 255)),
                        );
                    }
                });
        });

        // Readings arrive on their own schedule.
        ctx.request_repaint_after(engine::POLL_INTERVAL * 20);
    }
}

impl Drop for MonitorApp {
    fn drop(&mut self) {
        self.tx_cmd.send(MonitorCommand::Shutdown).ok();
        if let Some(handle) = self.engine.take() {
            if handle.join().is_err() {
                log::error!("engine thread panicked");
            }
        }
    }
}

pub fn run(config: AppConfig) -> anyhow::Result<()> {
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([960.0, 600.0])
        .with_min_inner_size([720.0, 480.0])
        .with_title("FM Deviation Monitor");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "devmon",
        options,
        Box::new(move |_cc| Box::new(MonitorApp::new(config))),
    )
    .map_err(|e| anyhow::anyhow!("GUI failed: {e}"))
}
