// ui.rs - egui front end: controls, board rendering and cell toggling

use eframe::egui;
use egui::{Color32, Rect, Stroke, Vec2};
use std::time::Duration;

use crate::GameOfLife;
use conway_engine::RunMode;
use conway_engine::patterns;

const BOARD_PIXELS: f32 = 800.0;

impl eframe::App for GameOfLife {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.refresh();
        let mode = self.sim.mode();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Conway's Game of Life (worker pool)");

            // Controls
            ui.horizontal(|ui| {
                let run_text = if mode == RunMode::Paused { "▶ Resume" } else { "▶ Run" };
                if ui.add_enabled(mode != RunMode::Running, egui::Button::new(run_text)).clicked() {
                    let result = match mode {
                        RunMode::Paused => { self.sim.resume(); Ok(()) }
                        _ => self.sim.start().map(|_| ()),
                    };
                    self.history.reset();
                    self.report(result);
                }

                if ui.add_enabled(mode == RunMode::Running, egui::Button::new("⏸ Pause")).clicked() {
                    self.sim.pause();
                }

                if ui.button("⏭ Step").clicked() {
                    let result = self.sim.step();
                    self.report(result);
                }

                if ui.add_enabled(mode != RunMode::Stopped, egui::Button::new("⏹ Stop")).clicked() {
                    let result = self.sim.stop();
                    self.report(result);
                }

                if ui.button("Clear").clicked() {
                    let result = self.sim.clear();
                    self.history.reset();
                    self.report(result);
                }

                if ui.button("🎲 Random").clicked() {
                    self.random_seed = self.random_seed.wrapping_add(1);
                    let result = self.sim.randomize(self.random_seed);
                    self.history.reset();
                    self.report(result);
                }

                ui.separator();

                // Pattern dropdown
                ui.label("Pattern:");
                egui::ComboBox::from_id_source("pattern_selector")
                    .selected_text(patterns::PATTERNS[self.selected_pattern].name)
                    .show_ui(ui, |ui| {
                        for (i, pattern) in patterns::PATTERNS.iter().enumerate() {
                            ui.selectable_value(&mut self.selected_pattern, i, pattern.name);
                        }
                    });

                if ui.button("Apply Pattern").clicked() {
                    let result = self.sim.apply_pattern(&patterns::PATTERNS[self.selected_pattern]);
                    self.history.reset();
                    self.report(result);
                }
            });

            ui.separator();

            ui.horizontal(|ui| {
                let config = self.sim.config();
                ui.label(format!("Generation: {}", self.snapshot.generation));
                ui.separator();
                ui.label(format!("State: {mode}"));
                ui.separator();
                ui.label(format!(
                    "Workers: {}  Tasks: {}  Active: {}",
                    config.workers, config.tasks, self.sim.active_workers()
                ));
                ui.separator();
                ui.label(format!("Delay: {:?}", config.effective_delay()));

                ui.separator();

                // Show current colors
                ui.label("Live:");
                ui.color_edit_button_srgba(&mut self.live_color);
                ui.label("Dead:");
                ui.color_edit_button_srgba(&mut self.dead_color);
            });

            if let Some(status) = &self.status {
                ui.colored_label(Color32::YELLOW, status.as_str());
            }

            ui.separator();

            ui.label("Click cells to toggle them while the simulation is stopped.");

            ui.separator();

            // Draw the board from the last completed generation
            let side = self.snapshot.side();
            let pitch = BOARD_PIXELS / side as f32;
            let spacing = if pitch >= 4.0 { 0.5 } else { 0.0 };
            let box_size = pitch - spacing;

            let total_size = Vec2::splat(pitch * side as f32 - spacing);
            let (response, painter) = ui.allocate_painter(total_size, egui::Sense::click());
            let origin = response.rect.min;

            // Fill background
            painter.rect_filled(response.rect, 0.0, Color32::BLACK);

            for row in 0..side {
                for col in 0..side {
                    let rect = Rect::from_min_size(
                        origin + Vec2::new(col as f32 * pitch, row as f32 * pitch),
                        Vec2::splat(box_size),
                    );

                    let cell_color = if self.snapshot.is_alive(row, col) {
                        self.live_color
                    } else {
                        self.dead_color
                    };
                    painter.rect_filled(rect, 1.0, cell_color);

                    if spacing > 0.0 {
                        painter.rect_stroke(rect, 1.0, Stroke::new(0.2, Color32::from_gray(60)));
                    }
                }
            }

            // Handle clicking (rejected by the engine unless stopped)
            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let col = ((pos.x - origin.x) / pitch) as usize;
                    let row = ((pos.y - origin.y) / pitch) as usize;
                    match self.sim.toggle(row, col) {
                        Ok(_) => {
                            self.snapshot = self.sim.snapshot();
                            self.status = None;
                        }
                        Err(err) => self.status = Some(err.to_string()),
                    }
                }
            }

            ui.separator();

            // Statistics
            let cells = side * side;
            let live_cells = self.snapshot.population();
            ui.horizontal(|ui| {
                ui.label(format!("Live cells: {}", live_cells));
                ui.label(format!("Dead cells: {}", cells - live_cells));
                ui.label(format!("Population: {:.1}%", (live_cells as f32 / cells as f32) * 100.0));
            });
        });

        // Keep polling for new generations while workers are active
        if mode != RunMode::Stopped || self.sim.active_workers() > 0 {
            ctx.request_repaint_after(Duration::from_millis(16));
        }
    }
}
