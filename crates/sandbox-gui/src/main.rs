//! # Dynamics Sandbox GUI
//!
//! Interactive front end for the sandbox:
//! - Neuron view: voltage traces of Hodgkin-Huxley, FitzHugh-Nagumo and Hindmarsh-Rose
//! - Attractor view: 2-D projections of Lorenz and Rossler trajectories
//!
//! Every slider change restarts a 300 ms quiet period; the simulation reruns
//! once the inputs have settled.

use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};
use sandbox_attractors::{simulate_attractor, Attractor};
use sandbox_core::{Locale, PhaseSystem, PhaseTrajectory, SimulationLimits, Trajectory};
use sandbox_neuron::{
    count_spikes, simulate_with, HhParameters, ModelType, Protocol, TestType, SPIKE_THRESHOLD,
};
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

const DEBOUNCE: Duration = Duration::from_millis(300);
const MAX_PLOT_POINTS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum View {
    #[default]
    Neuron,
    Attractor,
}

/// Pair of state axes shown in the phase plot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Projection {
    #[default]
    XY,
    XZ,
    YZ,
}

impl Projection {
    fn all() -> &'static [Self] {
        &[Self::XY, Self::XZ, Self::YZ]
    }

    fn name(&self) -> &'static str {
        match self {
            Self::XY => "x-y",
            Self::XZ => "x-z",
            Self::YZ => "y-z",
        }
    }

    fn axes(&self) -> (usize, usize) {
        match self {
            Self::XY => (0, 1),
            Self::XZ => (0, 2),
            Self::YZ => (1, 2),
        }
    }
}

/// Trailing-edge debounce over input changes
#[derive(Debug, Clone, Copy)]
struct Debounce {
    delay: Duration,
    last_change: Option<Instant>,
}

impl Debounce {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_change: None,
        }
    }

    fn touch(&mut self, now: Instant) {
        self.last_change = Some(now);
    }

    /// `Ok(())` once the quiet period has elapsed (and clears the pending
    /// change); otherwise the remaining wait, if a change is pending.
    fn poll(&mut self, now: Instant) -> Result<(), Option<Duration>> {
        match self.last_change {
            None => Err(None),
            Some(at) => {
                let elapsed = now.saturating_duration_since(at);
                if elapsed >= self.delay {
                    self.last_change = None;
                    Ok(())
                } else {
                    Err(Some(self.delay - elapsed))
                }
            }
        }
    }
}

/// Application state
struct SandboxApp {
    // UI state
    view: View,
    dark_mode: bool,
    locale: Locale,
    limits: SimulationLimits,
    debounce: Debounce,

    // Neuron view
    model: ModelType,
    test: TestType,
    hh: HhParameters,
    current: f64,
    duration: f64,
    dt: f64,
    trace: Option<Trajectory>,

    // Attractor view
    system: Attractor,
    params: Vec<f64>,
    state: Vec<f64>,
    time: f64,
    attractor_dt: f64,
    projection: Projection,
    phase: Option<PhaseTrajectory>,

    // Status
    status_message: String,
}

impl Default for SandboxApp {
    fn default() -> Self {
        let model = ModelType::HodgkinHuxley;
        let system = Attractor::Lorenz;
        Self {
            view: View::default(),
            dark_mode: true,
            locale: Locale::En,
            limits: SimulationLimits::default(),
            debounce: Debounce::new(DEBOUNCE),
            model,
            test: TestType::default(),
            hh: HhParameters::default(),
            current: model.default_current(),
            duration: 100.0,
            dt: 0.01,
            trace: None,
            system,
            params: system.default_params(),
            state: system.default_state(),
            time: 100.0,
            attractor_dt: 0.01,
            projection: Projection::default(),
            phase: None,
            status_message: "Ready".into(),
        }
    }
}

impl SandboxApp {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut style = (*cc.egui_ctx.style()).clone();
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        cc.egui_ctx.set_style(style);

        let mut app = Self::default();
        app.simulate();
        app
    }

    /// Rerun whichever view is visible
    fn simulate(&mut self) {
        let outcome = match self.view {
            View::Neuron => self.simulate_neuron(),
            View::Attractor => self.simulate_attractor(),
        };
        if let Err(e) = outcome {
            log::warn!("Simulation rejected: {}", e);
            self.status_message = format!("Error: {}", e);
        }
    }

    fn simulate_neuron(&mut self) -> anyhow::Result<()> {
        self.limits.check(self.duration, self.dt)?;
        let protocol = Protocol {
            duration: self.duration,
            dt: self.dt,
            i_ext: Some(self.current),
        };
        let started = Instant::now();
        let trace = simulate_with(self.model, self.test, &self.hh, &protocol)?;
        let spikes = count_spikes(&trace, SPIKE_THRESHOLD);

        self.status_message = format!(
            "{}: {} samples, {} spikes ({:.0} ms)",
            self.model.display_name(),
            trace.len(),
            spikes,
            started.elapsed().as_secs_f64() * 1000.0
        );
        self.trace = Some(trace.downsample(MAX_PLOT_POINTS));
        Ok(())
    }

    fn simulate_attractor(&mut self) -> anyhow::Result<()> {
        self.limits.check(self.time, self.attractor_dt)?;
        let phase = simulate_attractor(
            self.system.name(),
            &self.params,
            &self.state,
            self.time,
            self.attractor_dt,
        )?;

        let finite = phase.finite_points().len();
        self.status_message = if finite < phase.len() {
            format!("{} of {} points diverged; lower dt", phase.len() - finite, phase.len())
        } else {
            format!("{}: {} points", self.system.descriptor().label.get(self.locale), phase.len())
        };
        self.phase = Some(phase);
        Ok(())
    }

    fn select_system(&mut self, system: Attractor) {
        self.system = system;
        self.params = system.default_params();
        self.state = system.default_state();
    }

    fn export_data(&mut self) {
        let default_name = match self.view {
            View::Neuron => format!("{}_trace.json", self.model.tag()),
            View::Attractor => format!("{}_trajectory.json", self.system.name()),
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name(default_name)
            .save_file()
        else {
            return;
        };

        let content = match self.view {
            View::Neuron => self.trace.as_ref().map(serde_json::to_string_pretty),
            View::Attractor => self.phase.as_ref().map(serde_json::to_string_pretty),
        };

        let written = match content {
            Some(Ok(json)) => std::fs::write(&path, json).map_err(anyhow::Error::from),
            Some(Err(e)) => Err(e.into()),
            None => Err(anyhow::anyhow!("nothing to export")),
        };

        self.status_message = match written {
            Ok(()) => format!("Exported: {}", path.display()),
            Err(e) => format!("Export error: {}", e),
        };
    }

    fn neuron_controls(&mut self, ui: &mut egui::Ui) -> bool {
        let mut changed = false;

        let previous = self.model;
        egui::ComboBox::from_label("Model")
            .selected_text(self.model.display_name())
            .show_ui(ui, |ui| {
                for model in ModelType::all() {
                    ui.selectable_value(&mut self.model, *model, model.display_name());
                }
            });
        if self.model != previous {
            self.current = self.model.default_current();
            changed = true;
        }

        let previous = self.test;
        egui::ComboBox::from_label("Test")
            .selected_text(self.test.tag())
            .show_ui(ui, |ui| {
                for test in TestType::all() {
                    ui.selectable_value(&mut self.test, *test, test.tag());
                }
            });
        changed |= self.test != previous;

        ui.separator();
        changed |= slider(ui, &mut self.current, -5.0..=20.0, "I_ext");
        changed |= slider(ui, &mut self.duration, 10.0..=500.0, "Duration (ms)");
        changed |= ui
            .add(egui::Slider::new(&mut self.dt, 0.001..=0.1).logarithmic(true).text("dt (ms)"))
            .changed();

        if self.model == ModelType::HodgkinHuxley {
            ui.separator();
            ui.label("Membrane");
            let hh = &mut self.hh;
            changed |= slider(ui, &mut hh.g_na, 0.0..=200.0, "gNa");
            changed |= slider(ui, &mut hh.g_k, 0.0..=100.0, "gK");
            changed |= slider(ui, &mut hh.g_l, 0.0..=1.0, "gL");
            changed |= slider(ui, &mut hh.e_na, 0.0..=100.0, "ENa");
            changed |= slider(ui, &mut hh.e_k, -100.0..=0.0, "EK");
            changed |= slider(ui, &mut hh.e_l, -100.0..=0.0, "EL");
            changed |= slider(ui, &mut hh.cm, 0.1..=5.0, "Cm");
            if ui.button("Reset membrane").clicked() {
                self.hh = HhParameters::default();
                changed = true;
            }
        }

        changed
    }

    fn attractor_controls(&mut self, ui: &mut egui::Ui) -> bool {
        let mut changed = false;
        let locale = self.locale;

        let mut selected = self.system;
        egui::ComboBox::from_label("System")
            .selected_text(self.system.descriptor().label.get(locale))
            .show_ui(ui, |ui| {
                for system in Attractor::all() {
                    ui.selectable_value(&mut selected, *system, system.descriptor().label.get(locale));
                }
            });
        if selected != self.system {
            self.select_system(selected);
            changed = true;
        }

        let descriptor = self.system.descriptor();

        ui.separator();
        ui.label("Parameters");
        for (value, param) in self.params.iter_mut().zip(descriptor.params) {
            changed |= slider(ui, value, param.min..=param.max, param.name);
        }

        ui.separator();
        ui.label("Initial state");
        for (value, var) in self.state.iter_mut().zip(descriptor.state_variables) {
            changed |= slider(ui, value, var.min..=var.max, var.name);
        }

        ui.separator();
        changed |= slider(ui, &mut self.time, 100.0..=1000.0, "Time");
        changed |= ui
            .add(egui::Slider::new(&mut self.attractor_dt, 1e-4..=1e-2).logarithmic(true).text("dt"))
            .changed();

        if ui.button("Reset").clicked() {
            self.select_system(self.system);
            changed = true;
        }

        ui.separator();
        ui.horizontal(|ui| {
            for projection in Projection::all() {
                ui.selectable_value(&mut self.projection, *projection, projection.name());
            }
        });

        changed
    }

    fn neuron_plot(&self, ui: &mut egui::Ui) {
        let points: PlotPoints = self
            .trace
            .iter()
            .flat_map(|t| t.time.iter().zip(&t.voltage))
            .filter(|(_, v)| v.is_finite())
            .map(|(t, v)| [*t, *v])
            .collect();

        Plot::new("voltage_plot")
            .x_axis_label("Time (ms)")
            .y_axis_label("Voltage (mV)")
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(points)
                        .name(self.model.tag())
                        .color(egui::Color32::from_rgb(100, 200, 100)),
                );
            });
    }

    fn phase_plot(&self, ui: &mut egui::Ui) {
        let (a, b) = self.projection.axes();
        let scale = self.system.descriptor().scale;
        let points: PlotPoints = self
            .phase
            .iter()
            .flat_map(|p| p.points())
            .filter(|p| p.iter().all(|v| v.is_finite()))
            .map(|p| [p[a] * scale, p[b] * scale])
            .collect();

        let vars = self.system.descriptor().state_variables;
        Plot::new("phase_plot")
            .data_aspect(1.0)
            .x_axis_label(vars[a].name)
            .y_axis_label(vars[b].name)
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(points)
                        .name(self.system.name())
                        .color(egui::Color32::from_rgb(100, 150, 250)),
                );
            });
    }
}

fn slider(ui: &mut egui::Ui, value: &mut f64, range: RangeInclusive<f64>, text: &str) -> bool {
    ui.add(egui::Slider::new(value, range).text(text)).changed()
}

impl eframe::App for SandboxApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match self.debounce.poll(Instant::now()) {
            Ok(()) => self.simulate(),
            Err(Some(wait)) => ctx.request_repaint_after(wait),
            Err(None) => {}
        }

        if self.dark_mode {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Export JSON...").clicked() {
                        self.export_data();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("View", |ui| {
                    ui.checkbox(&mut self.dark_mode, "Dark Mode");
                    ui.separator();
                    ui.radio_value(&mut self.locale, Locale::En, "English");
                    ui.radio_value(&mut self.locale, Locale::Ru, "Русский");
                });

                ui.separator();
                let previous = self.view;
                ui.selectable_value(&mut self.view, View::Neuron, "Neuron");
                ui.selectable_value(&mut self.view, View::Attractor, "Attractor");
                if self.view != previous {
                    self.simulate();
                }
            });
        });

        // Status bar at bottom
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.debounce.last_change.is_some() {
                    ui.spinner();
                }
                ui.label(&self.status_message);
            });
        });

        // Controls (left)
        egui::SidePanel::left("controls_panel")
            .default_width(280.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let changed = match self.view {
                        View::Neuron => self.neuron_controls(ui),
                        View::Attractor => self.attractor_controls(ui),
                    };
                    if changed {
                        self.debounce.touch(Instant::now());
                        ctx.request_repaint_after(DEBOUNCE);
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| match self.view {
            View::Neuron => {
                ui.heading("Membrane Potential");
                self.neuron_plot(ui);
            }
            View::Attractor => {
                ui.heading(format!("Phase Space ({})", self.projection.name()));
                self.phase_plot(ui);
            }
        });
    }
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title("Dynamics Sandbox"),
        ..Default::default()
    };

    eframe::run_native(
        "DynamicsSandbox",
        native_options,
        Box::new(|cc| Ok(Box::new(SandboxApp::new(cc)))),
    )
}
