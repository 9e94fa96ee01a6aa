/*!
 * GUI application for eia-trends - EIA energy statistics fetcher and dashboard
 *
 * A cross-platform desktop application providing an intuitive interface for:
 * - Selecting states, sectors, and a period range
 * - Picking the metric to chart
 * - Exporting data and generating charts
 *
 * Platform support: Windows, macOS, Linux
 */

use eframe::egui;
use eia_trends::{CancelToken, Client, Completion, FetchOptions, Metric};
use eia_trends::{normalize, storage, viz};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

fn main() -> Result<(), eframe::Error> {
    // Enable logging for better debugging
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_min_inner_size([600.0, 400.0])
            .with_title("Energy Trends - eia-trends"),
        ..Default::default()
    };

    eframe::run_native(
        "Energy Trends",
        options,
        Box::new(|_cc| Ok(Box::new(TrendsApp::new()))),
    )
}

/// Main application state
struct TrendsApp {
    // Input fields
    states: String,
    sectors: String,
    start: String,
    end: String,
    metric: MetricOption,

    // Export options
    export_format: ExportFormat,
    output_path: String,
    split_sectors: bool,
    create_plot: bool,
    plot_format: PlotFormat,
    plot_width: u32,
    plot_height: u32,

    // UI state
    is_loading: bool,
    status_message: String,
    error_message: String,

    // Background operation
    operation_receiver: Option<mpsc::Receiver<OperationResult>>,
    cancel: Option<CancelToken>,
}

#[derive(Debug, Clone, PartialEq)]
enum ExportFormat {
    Csv,
    Json,
    Both,
}

#[derive(Debug, Clone, PartialEq)]
enum PlotFormat {
    Png,
    Svg,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MetricOption {
    Customers,
    Price,
    Revenue,
    Sales,
}

impl MetricOption {
    fn to_metric(self) -> Metric {
        match self {
            MetricOption::Customers => Metric::Customers,
            MetricOption::Price => Metric::Price,
            MetricOption::Revenue => Metric::Revenue,
            MetricOption::Sales => Metric::Sales,
        }
    }
}

#[derive(Debug)]
enum OperationResult {
    Success(String),
    Error(String),
}

impl TrendsApp {
    fn new() -> Self {
        // Default to user's home directory for output
        let home_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .to_string_lossy()
            .to_string();

        Self {
            states: "US".to_string(),
            sectors: "RES".to_string(),
            start: "2001-01".to_string(),
            end: String::new(),
            metric: MetricOption::Customers,

            export_format: ExportFormat::Csv,
            output_path: home_dir,
            split_sectors: false,
            create_plot: true,
            plot_format: PlotFormat::Png,
            plot_width: 1000,
            plot_height: 600,

            is_loading: false,
            status_message: String::new(),
            error_message: String::new(),
            operation_receiver: None,
            cancel: None,
        }
    }

    fn validate_inputs(&self) -> Result<(), String> {
        for (label, value) in [("start", &self.start), ("end", &self.end)] {
            if !value.trim().is_empty() && !normalize::is_monthly_period(value.trim()) {
                return Err(format!("The {label} period must look like 2001-01"));
            }
        }

        if self.output_path.trim().is_empty() {
            return Err("Please specify an output directory".to_string());
        }

        if self.create_plot {
            if self.plot_width < 200 || self.plot_width > 3000 {
                return Err("Plot width must be between 200 and 3000 pixels".to_string());
            }
            if self.plot_height < 200 || self.plot_height > 3000 {
                return Err("Plot height must be between 200 and 3000 pixels".to_string());
            }
        }

        Ok(())
    }

    fn start_operation(&mut self) {
        if let Err(err) = self.validate_inputs() {
            self.error_message = format!("Validation error: {}", err);
            return;
        }

        let client = match Client::from_env() {
            Ok(client) => client,
            Err(err) => {
                self.error_message = err.to_string();
                return;
            }
        };

        self.is_loading = true;
        self.error_message.clear();
        self.status_message = "Fetching data from the EIA API...".to_string();

        let (sender, receiver) = mpsc::channel();
        self.operation_receiver = Some(receiver);

        let cancel = CancelToken::new();
        self.cancel = Some(cancel.clone());

        // Clone the data we need for the background thread
        let mut opts = FetchOptions::retail_sales()
            .with_states(parse_list(&self.states))
            .with_sectors(parse_list(&self.sectors));
        opts.start = non_empty(&self.start);
        opts.end = non_empty(&self.end);
        opts.cancel = Some(cancel);

        let config = OperationConfig {
            export_format: self.export_format.clone(),
            output_path: self.output_path.clone(),
            split_sectors: self.split_sectors,
            metric: self.metric.to_metric(),
            plot_config: self.create_plot.then(|| PlotConfig {
                format: self.plot_format.clone(),
                width: self.plot_width,
                height: self.plot_height,
            }),
        };

        // Spawn background thread for the operation
        thread::spawn(move || {
            let result = perform_operation(client, opts, config);
            let _ = sender.send(result);
        });
    }

    fn check_operation_result(&mut self) {
        if let Some(receiver) = &self.operation_receiver
            && let Ok(result) = receiver.try_recv()
        {
            self.is_loading = false;
            self.operation_receiver = None;
            self.cancel = None;

            match result {
                OperationResult::Success(message) => {
                    self.status_message = message;
                    self.error_message.clear();
                }
                OperationResult::Error(error) => {
                    self.error_message = error;
                    self.status_message.clear();
                }
            }
        }
    }
}

impl eframe::App for TrendsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for completed background operations
        self.check_operation_result();

        // Request repaint if loading (for spinner animation)
        if self.is_loading {
            ctx.request_repaint();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Energy Customer Trends");
                ui.add_space(10.0);

                // Main input section
                ui.group(|ui| {
                    ui.label("Data Selection");
                    ui.add_space(5.0);

                    ui.horizontal(|ui| {
                        ui.label("States:");
                        ui.text_edit_singleline(&mut self.states)
                            .on_hover_text("Enter state codes separated by commas (e.g., US,CO,TX); empty fetches all");
                    });

                    ui.horizontal(|ui| {
                        ui.label("Sectors:");
                        ui.text_edit_singleline(&mut self.sectors)
                            .on_hover_text("Enter sector codes separated by commas (e.g., RES,COM,IND); empty fetches all");
                    });

                    ui.horizontal(|ui| {
                        ui.label("Period range:");
                        ui.text_edit_singleline(&mut self.start)
                            .on_hover_text("First period, YYYY-MM");
                        ui.label("to");
                        ui.text_edit_singleline(&mut self.end)
                            .on_hover_text("Last period, YYYY-MM; empty means latest");
                    });

                    ui.horizontal(|ui| {
                        ui.label("Metric:");
                        egui::ComboBox::from_label("")
                            .selected_text(self.metric.to_metric().label())
                            .show_ui(ui, |ui| {
                                for option in [
                                    MetricOption::Customers,
                                    MetricOption::Price,
                                    MetricOption::Revenue,
                                    MetricOption::Sales,
                                ] {
                                    ui.selectable_value(
                                        &mut self.metric,
                                        option,
                                        option.to_metric().label(),
                                    );
                                }
                            });
                    });
                });

                ui.add_space(10.0);

                // Export options section
                ui.group(|ui| {
                    ui.label("Export Options");
                    ui.add_space(5.0);

                    ui.horizontal(|ui| {
                        ui.label("Format:");
                        ui.radio_value(&mut self.export_format, ExportFormat::Csv, "CSV");
                        ui.radio_value(&mut self.export_format, ExportFormat::Json, "JSON");
                        ui.radio_value(&mut self.export_format, ExportFormat::Both, "Both");
                    });

                    ui.horizontal(|ui| {
                        ui.label("Output path:");
                        ui.text_edit_singleline(&mut self.output_path);
                        if ui.button("Browse").clicked()
                            && let Some(path) = rfd::FileDialog::new().pick_folder() {
                            self.output_path = path.to_string_lossy().to_string();
                        }
                    });

                    ui.checkbox(&mut self.split_sectors, "Also write one CSV per sector");
                    ui.checkbox(&mut self.create_plot, "Create chart");

                    if self.create_plot {
                        ui.horizontal(|ui| {
                            ui.label("Chart format:");
                            ui.radio_value(&mut self.plot_format, PlotFormat::Png, "PNG");
                            ui.radio_value(&mut self.plot_format, PlotFormat::Svg, "SVG");
                        });

                        ui.horizontal(|ui| {
                            ui.label("Dimensions:");
                            ui.add(egui::DragValue::new(&mut self.plot_width).range(200..=3000));
                            ui.label("×");
                            ui.add(egui::DragValue::new(&mut self.plot_height).range(200..=3000));
                            ui.label("pixels");
                        });
                    }
                });

                ui.add_space(15.0);

                // Action buttons
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(!self.is_loading, egui::Button::new("Fetch Data"))
                        .clicked()
                    {
                        self.start_operation();
                    }

                    if self.is_loading {
                        if ui.button("Cancel").clicked()
                            && let Some(cancel) = &self.cancel
                        {
                            cancel.cancel();
                        }
                        ui.spinner();
                        ui.label("Processing...");
                    }
                });

                ui.add_space(10.0);

                // Status messages
                if !self.status_message.is_empty() {
                    ui.colored_label(egui::Color32::DARK_GREEN, &self.status_message);
                }

                if !self.error_message.is_empty() {
                    ui.colored_label(egui::Color32::RED, &self.error_message);
                }
            });
        });
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_ascii_uppercase())
        .filter(|x| !x.is_empty())
        .collect()
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug)]
struct OperationConfig {
    export_format: ExportFormat,
    output_path: String,
    split_sectors: bool,
    metric: Metric,
    plot_config: Option<PlotConfig>,
}

#[derive(Debug)]
struct PlotConfig {
    format: PlotFormat,
    width: u32,
    height: u32,
}

fn perform_operation(
    client: Client,
    opts: FetchOptions,
    config: OperationConfig,
) -> OperationResult {
    // Fetch data
    let report = match client.fetch_retail_sales(&opts) {
        Ok(report) => report,
        Err(err) => return OperationResult::Error(format!("Failed to fetch data: {}", err)),
    };

    let incomplete_note = match &report.completion {
        Completion::Complete => None,
        Completion::Incomplete { next_offset, .. } => Some(format!(
            "\n\nNote: the fetch stopped early at offset {}; the files hold a partial dataset.",
            next_offset
        )),
    };

    let points = normalize::observations(&report.rows);

    if points.is_empty() {
        return OperationResult::Error(
            "No data returned from the API. Please check your state and sector codes.".to_string(),
        );
    }

    let mut output_files = Vec::new();

    // Export data
    let output_dir = PathBuf::from(&config.output_path);

    if matches!(
        config.export_format,
        ExportFormat::Csv | ExportFormat::Both
    ) {
        let csv_path = output_dir.join("energy_data.csv");
        if let Err(err) = storage::save_csv(&points, &csv_path) {
            return OperationResult::Error(format!("Failed to save CSV: {}", err));
        }
        output_files.push(csv_path.to_string_lossy().to_string());

        if config.split_sectors {
            match storage::save_sector_csvs(&points, &output_dir, "energy_data") {
                Ok(written) => output_files
                    .extend(written.iter().map(|p| p.to_string_lossy().to_string())),
                Err(err) => {
                    return OperationResult::Error(format!(
                        "Failed to save per-sector CSVs: {}",
                        err
                    ));
                }
            }
        }
    }

    if matches!(
        config.export_format,
        ExportFormat::Json | ExportFormat::Both
    ) {
        let json_path = output_dir.join("energy_data.json");
        if let Err(err) = storage::save_json(&points, &json_path) {
            return OperationResult::Error(format!("Failed to save JSON: {}", err));
        }
        output_files.push(json_path.to_string_lossy().to_string());
    }

    // Create plot if requested
    if let Some(plot_config) = config.plot_config {
        let plot_extension = match plot_config.format {
            PlotFormat::Png => "png",
            PlotFormat::Svg => "svg",
        };
        let plot_path = output_dir.join(format!("energy_chart.{}", plot_extension));

        if let Err(err) = viz::plot_lines(
            &points,
            config.metric,
            &plot_path,
            plot_config.width,
            plot_config.height,
        ) {
            return OperationResult::Error(format!("Failed to create chart: {}", err));
        }

        output_files.push(plot_path.to_string_lossy().to_string());
    }

    let mut message = format!("Successfully processed {} data points!", points.len());
    if !output_files.is_empty() {
        message.push_str(&format!("\n\nFiles created:\n{}", output_files.join("\n")));
    }
    if let Some(note) = incomplete_note {
        message.push_str(&note);
    }

    OperationResult::Success(message)
}
