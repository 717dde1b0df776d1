// src/bin/game_window.rs - Windowed game driven by the simulated estimator
use anyhow::Result;
use eframe::egui;
use pick_kick::app::{EstimatorChoice, GameSession, RunningPipeline, SessionOptions, SourceChoice};
use pick_kick::config::AppConfig;
use pick_kick::landmarks::LandmarkSnapshot;
use pick_kick::ui::{score_cards, GameCanvas};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{info, warn};

struct GameWindow {
    // Owns the worker threads; dropped last.
    _runtime: Runtime,
    pipeline: RunningPipeline,
    session: GameSession,
    canvas: GameCanvas,
    landmarks: LandmarkSnapshot,
    highlight: (bool, bool),
    clock: f64,
    source_finished: bool,
}

impl GameWindow {
    fn new(config: AppConfig) -> Result<Self> {
        let runtime = Runtime::new()?;
        let estimator = EstimatorChoice::Simulated.build(&config)?;
        let options = SessionOptions::default();

        let pipeline = {
            let _guard = runtime.enter();
            RunningPipeline::start(&config, SourceChoice::Synthetic, estimator, None)
        };
        let session = GameSession::new(config, &options);

        Ok(Self {
            _runtime: runtime,
            pipeline,
            session,
            canvas: GameCanvas::new(),
            landmarks: LandmarkSnapshot::default(),
            highlight: (false, false),
            clock: 0.0,
            source_finished: false,
        })
    }

    fn drain_results(&mut self) {
        loop {
            match self.pipeline.results.try_recv() {
                Ok(classification) => {
                    self.clock = classification.timestamp;
                    self.highlight = (classification.pick_detected, classification.kick_detected);
                    self.landmarks = classification.landmarks.clone();
                    for hit in self.session.handle(classification) {
                        info!("{} at frame {}", hit.kind.hit_message(), hit.frame_index);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.source_finished {
                        warn!("Classification stream ended");
                        self.source_finished = true;
                    }
                    break;
                }
            }
        }
    }
}

impl eframe::App for GameWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_results();

        let game = self.session.game();
        egui::TopBottomPanel::top("scores").show(ctx, |ui| {
            ui.add_space(8.0);
            score_cards(ui, &self.canvas.theme, game.scores());
            ui.add_space(8.0);
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(self.canvas.theme.background))
            .show(ctx, |ui| {
                self.canvas.draw(
                    ui,
                    game,
                    &self.landmarks,
                    self.highlight,
                    game.feedback_at(self.clock),
                );
            });

        ctx.request_repaint();
    }
}

impl Drop for GameWindow {
    fn drop(&mut self) {
        self.pipeline.stop_capture();
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let config = match AppConfig::load_or_default("pick_kick.json").and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return;
        }
    };
    let surface = config.game.surface;

    let window = match GameWindow::new(config) {
        Ok(window) => window,
        Err(e) => {
            eprintln!("Failed to start game: {:#}", e);
            return;
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([surface.width as f32, surface.height as f32 + 90.0]),
        centered: true,
        ..Default::default()
    };

    let result = eframe::run_native(
        "Pick & Kick",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Box::new(window)
        }),
    );

    if let Err(e) = result {
        eprintln!("Error running application: {:?}", e);
    }
}
