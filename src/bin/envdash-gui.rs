/*!
 * Desktop dashboard for envdash - environment & economy indicators
 *
 * A sidebar picks one country and a year range; the main area shows:
 * - Load errors for any source that failed
 * - CO₂ per capita, energy use and GDP growth charts for the selection
 * - Collapsible previews of the temperature and natural-disaster tables
 *
 * Platform support: Windows, macOS, Linux
 */

use anyhow::Result;
use eframe::egui;
use envdash::dashboard::{ChartPanel, DashboardView, Panel, PreviewPanel};
use envdash::config;
use envdash::stats::fmt_opt;
use envdash::{Loader, Selection, SourceUrls, Sources, YearRange, build_view, storage, viz};
use log::{error, info};
use std::sync::{Arc, mpsc};
use std::thread;

fn main() -> Result<()> {
    env_logger::init();

    let urls = SourceUrls::resolve(None)?;
    let loader = Arc::new(Loader::http()?);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 500.0])
            .with_title("Environment & Economy Dashboard"),
        ..Default::default()
    };

    eframe::run_native(
        "Environment & Economy Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(DashApp::new(loader, urls)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}

/// Main application state
struct DashApp {
    loader: Arc<Loader>,
    urls: SourceUrls,

    sources: Option<Sources>,
    selection: Option<Selection>,
    view: Option<DashboardView>,

    // UI state
    is_loading: bool,
    status_message: String,
    error_message: String,

    load_receiver: Option<mpsc::Receiver<Sources>>,
}

impl DashApp {
    fn new(loader: Arc<Loader>, urls: SourceUrls) -> Self {
        let mut app = Self {
            loader,
            urls,
            sources: None,
            selection: None,
            view: None,
            is_loading: false,
            status_message: String::new(),
            error_message: String::new(),
            load_receiver: None,
        };
        app.start_loading();
        app
    }

    fn start_loading(&mut self) {
        self.is_loading = true;
        self.error_message.clear();
        self.status_message = "Loading datasets...".to_string();

        let (sender, receiver) = mpsc::channel();
        self.load_receiver = Some(receiver);

        let loader = Arc::clone(&self.loader);
        let urls = self.urls.clone();
        thread::spawn(move || {
            let sources = loader.load_all(&urls);
            let _ = sender.send(sources);
        });
    }

    fn reload(&mut self) {
        self.loader.reset();
        info!("cache cleared, reloading all sources");
        self.start_loading();
    }

    fn check_load_result(&mut self) {
        if let Some(receiver) = &self.load_receiver
            && let Ok(sources) = receiver.try_recv()
        {
            self.is_loading = false;
            self.load_receiver = None;
            self.status_message.clear();
            self.sources = Some(sources);
            self.rebuild_view();
        }
    }

    /// Recompute the view after the data or the selection changed.
    fn rebuild_view(&mut self) {
        if let Some(sources) = &self.sources {
            let view = build_view(sources, self.selection.as_ref());
            self.selection = Some(view.selection.clone());
            self.view = Some(view);
        }
    }

    fn export_csv(&mut self) {
        let Some(view) = &self.view else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV", &["csv"])
            .set_file_name("envdash.csv")
            .save_file()
        else {
            return;
        };
        let rows = storage::export_rows(view);
        match storage::save_csv(&rows, &path) {
            Ok(()) => {
                self.error_message.clear();
                self.status_message = format!("Saved {} rows to {}", rows.len(), path.display());
            }
            Err(err) => {
                error!("export failed: {:#}", err);
                self.error_message = format!("Failed to save CSV: {}", err);
            }
        }
    }

    fn sidebar(&mut self, ui: &mut egui::Ui) {
        ui.heading("Filters");
        ui.add_space(5.0);

        let Some(view) = &self.view else {
            ui.label("Waiting for data...");
            return;
        };
        let controls = view.controls.clone();
        let mut country = view.selection.country.clone();
        let mut years = view.selection.years;

        egui::ComboBox::from_label("Country")
            .selected_text(&country)
            .width(180.0)
            .show_ui(ui, |ui| {
                for option in &controls.countries {
                    ui.selectable_value(&mut country, option.clone(), option);
                }
            });

        ui.add_space(5.0);
        ui.label("Year range");
        let lo = controls.bounds.start;
        let hi = controls.bounds.end;
        ui.add(egui::Slider::new(&mut years.start, lo..=hi).text("from"));
        ui.add(egui::Slider::new(&mut years.end, lo..=hi).text("to"));
        if years.start > years.end {
            years.end = years.start;
        }

        let wanted = Selection {
            country,
            years: YearRange::new(years.start, years.end),
        };
        if Some(&wanted) != self.selection.as_ref() {
            self.selection = Some(wanted);
            self.rebuild_view();
        }

        ui.add_space(15.0);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!self.is_loading, egui::Button::new("Reload data"))
                .on_hover_text("Clear the cache and fetch every source again")
                .clicked()
            {
                self.reload();
            }
            if ui
                .add_enabled(self.view.is_some(), egui::Button::new("Export CSV…"))
                .clicked()
            {
                self.export_csv();
            }
        });
    }
}

impl eframe::App for DashApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_load_result();

        // Keep polling the loader thread
        if self.is_loading {
            ctx.request_repaint();
        }

        egui::SidePanel::left("controls")
            .resizable(false)
            .default_width(220.0)
            .show(ctx, |ui| self.sidebar(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Environment & Economy Dashboard");

                if self.is_loading {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(&self.status_message);
                    });
                } else if !self.status_message.is_empty() {
                    ui.colored_label(egui::Color32::DARK_GREEN, &self.status_message);
                }
                if !self.error_message.is_empty() {
                    ui.colored_label(egui::Color32::RED, &self.error_message);
                }

                let Some(view) = &self.view else {
                    return;
                };

                ui.label(view.headline());
                ui.add_space(10.0);

                if !view.errors.is_empty() {
                    egui::CollapsingHeader::new("Data load errors (check the source URLs)")
                        .default_open(true)
                        .show(ui, |ui| {
                            for err in &view.errors {
                                ui.colored_label(egui::Color32::RED, err.to_string());
                            }
                        });
                    ui.add_space(10.0);
                }

                ui.columns(3, |cols| {
                    for (col, chart) in cols.iter_mut().zip(view.charts.iter()) {
                        chart_column(col, chart);
                    }
                });

                ui.add_space(15.0);
                for preview in &view.previews {
                    preview_section(ui, preview);
                }

                ui.add_space(15.0);
                ui.separator();
                sources_footer(ui, &self.urls);
            });
        });
    }
}

fn chart_column(ui: &mut egui::Ui, chart: &ChartPanel) {
    ui.strong(&chart.title);
    match &chart.body {
        Panel::Ready(series) => {
            draw_series(ui, &series.points(), chart.y_label);
            let s = &series.summary;
            ui.small(format!(
                "{} rows ({} missing) · min {} · max {} · mean {}",
                s.count + s.missing,
                s.missing,
                fmt_opt(s.min),
                fmt_opt(s.max),
                fmt_opt(s.mean),
            ));
        }
        Panel::Missing(msg) => {
            ui.colored_label(egui::Color32::from_rgb(200, 140, 0), msg);
        }
    }
}

/// Line chart drawn straight onto the painter; one point per year.
fn draw_series(ui: &mut egui::Ui, points: &[(i32, f64)], y_label: &str) {
    const HEIGHT: f32 = 220.0;
    const PAD_LEFT: f32 = 48.0;
    const PAD: f32 = 16.0;

    let width = ui.available_width();
    let (response, painter) =
        ui.allocate_painter(egui::vec2(width, HEIGHT), egui::Sense::hover());
    let rect = response.rect;
    let frame = egui::Stroke::new(1.0, egui::Color32::GRAY);
    let text_color = ui.visuals().text_color();
    let font = egui::FontId::proportional(11.0);
    painter.rect_stroke(rect, 2.0, frame);

    if points.is_empty() {
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "No data for this selection",
            font,
            text_color,
        );
        return;
    }

    let plot = egui::Rect::from_min_max(
        egui::pos2(rect.left() + PAD_LEFT, rect.top() + PAD),
        egui::pos2(rect.right() - PAD, rect.bottom() - PAD * 1.5),
    );

    let (mut x0, mut x1) = (points[0].0 as f64, points[points.len() - 1].0 as f64);
    if x1 <= x0 {
        x0 -= 1.0;
        x1 += 1.0;
    }
    let mut y0 = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let mut y1 = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    if (y1 - y0).abs() < f64::EPSILON {
        y0 -= 1.0;
        y1 += 1.0;
    }

    let to_screen = |year: i32, value: f64| {
        let tx = ((year as f64 - x0) / (x1 - x0)) as f32;
        let ty = ((value - y0) / (y1 - y0)) as f32;
        egui::pos2(
            plot.left() + tx * plot.width(),
            plot.bottom() - ty * plot.height(),
        )
    };

    let series = viz::util::SERIES_COLOR;
    let color = egui::Color32::from_rgb(series.0, series.1, series.2);
    let line: Vec<egui::Pos2> = points.iter().map(|(x, y)| to_screen(*x, *y)).collect();
    if line.len() > 1 {
        painter.add(egui::Shape::line(line.clone(), egui::Stroke::new(2.0, color)));
    }
    for p in &line {
        painter.circle_filled(*p, 2.5, color);
    }

    // Axis extremes
    let muted = text_color.gamma_multiply(0.7);
    painter.text(
        egui::pos2(plot.left() - 4.0, plot.top()),
        egui::Align2::RIGHT_CENTER,
        fmt_opt(Some(y1)),
        font.clone(),
        muted,
    );
    painter.text(
        egui::pos2(plot.left() - 4.0, plot.bottom()),
        egui::Align2::RIGHT_CENTER,
        fmt_opt(Some(y0)),
        font.clone(),
        muted,
    );
    painter.text(
        egui::pos2(plot.left(), plot.bottom() + 4.0),
        egui::Align2::LEFT_TOP,
        points[0].0.to_string(),
        font.clone(),
        muted,
    );
    painter.text(
        egui::pos2(plot.right(), plot.bottom() + 4.0),
        egui::Align2::RIGHT_TOP,
        points[points.len() - 1].0.to_string(),
        font.clone(),
        muted,
    );
    painter.text(
        egui::pos2(plot.left() + 4.0, plot.top()),
        egui::Align2::LEFT_TOP,
        y_label,
        font,
        muted,
    );
}

fn sources_footer(ui: &mut egui::Ui, urls: &SourceUrls) {
    ui.small(config::ATTRIBUTION);
    egui::Grid::new("source_urls").show(ui, |ui| {
        for (id, url) in urls.entries() {
            ui.small(id.name());
            ui.small(url);
            ui.end_row();
        }
    });
}

fn preview_section(ui: &mut egui::Ui, preview: &PreviewPanel) {
    ui.collapsing(preview.title, |ui| match &preview.body {
        Panel::Ready(data) => {
            ui.small(format!(
                "Showing {} of {} rows",
                data.table.height(),
                data.total_rows
            ));
            egui::ScrollArea::both()
                .id_salt(preview.title)
                .max_height(300.0)
                .show(ui, |ui| {
                    egui::Grid::new(preview.title).striped(true).show(ui, |ui| {
                        for header in &data.table.headers {
                            ui.strong(header);
                        }
                        ui.end_row();
                        for row in &data.table.rows {
                            for cell in row {
                                ui.label(cell.to_string());
                            }
                            ui.end_row();
                        }
                    });
                });
        }
        Panel::Missing(msg) => {
            ui.label(msg);
        }
    });
}
