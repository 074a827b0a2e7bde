use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, Color, Table as TextTable};
use envdash::dashboard::{Controls, DashboardView, Panel, PreviewPanel, Selection};
use envdash::config;
use envdash::stats::fmt_opt;
use envdash::{Loader, SourceId, SourceUrls, YearRange, build_view, storage, viz};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "envdash",
    version,
    about = "Load, filter, chart & export the CO2 / energy / GDP / temperature / disaster datasets"
)]
struct Cli {
    /// TOML secrets file with URL_CO2, URL_ENERGY, URL_GDP, URL_DISASTER, URL_TEMP.
    #[arg(long, global = true)]
    secrets: Option<PathBuf>,
    /// Override the CO2 per-capita CSV location (URL or path).
    #[arg(long, global = true)]
    url_co2: Option<String>,
    /// Override the World Bank energy-use CSV location.
    #[arg(long, global = true)]
    url_energy: Option<String>,
    /// Override the World Bank GDP-growth CSV location.
    #[arg(long, global = true)]
    url_gdp: Option<String>,
    /// Override the natural-disaster spreadsheet location.
    #[arg(long, global = true)]
    url_disaster: Option<String>,
    /// Override the temperature spreadsheet location.
    #[arg(long, global = true)]
    url_temp: Option<String>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the selection, load errors and a summary of each chart.
    Summary(SelectArgs),
    /// Write the three charts as SVG or PNG files.
    Plot(PlotArgs),
    /// Save the filtered chart rows as CSV or JSON.
    Export(ExportArgs),
    /// Show the first rows of a raw spreadsheet source.
    Preview(PreviewArgs),
}

#[derive(Args, Debug, Clone)]
struct SelectArgs {
    /// Country name, matched exactly (default: China if present, else the first).
    #[arg(short, long)]
    country: Option<String>,
    /// First year of the range (inclusive).
    #[arg(long)]
    from: Option<i32>,
    /// Last year of the range (inclusive).
    #[arg(long)]
    until: Option<i32>,
}

#[derive(ValueEnum, Clone, Debug)]
enum ImageFormat {
    Svg,
    Png,
}

#[derive(Args, Debug)]
struct PlotArgs {
    #[command(flatten)]
    select: SelectArgs,
    /// Directory for the chart files.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    #[arg(long, value_enum, default_value_t = ImageFormat::Svg)]
    format: ImageFormat,
    /// Width of each chart (default 800).
    #[arg(long, default_value_t = 800)]
    width: u32,
    /// Height of each chart (default 480).
    #[arg(long, default_value_t = 480)]
    height: u32,
    /// Locale for tick labels (en, de, fr, es, it, pt, nl).
    #[arg(long, default_value = "en")]
    locale: String,
    /// TrueType font for chart text.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    select: SelectArgs,
    /// Output file (format inferred by --format or extension).
    #[arg(long)]
    out: PathBuf,
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RawSource {
    Temperature,
    Disaster,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    #[arg(long, value_enum)]
    source: RawSource,
    /// Number of rows to print (at most 100).
    #[arg(long, default_value_t = 20)]
    rows: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let urls = resolve_urls(&cli)?;
    let loader = Loader::http()?;
    let sources = loader.load_all(&urls);
    let controls = Controls::from_sources(&sources);

    match cli.cmd {
        Command::Summary(args) => {
            let view = build_view(&sources, Some(&selection(&args, &controls)));
            cmd_summary(&view, &urls);
        }
        Command::Plot(args) => {
            let view = build_view(&sources, Some(&selection(&args.select, &controls)));
            cmd_plot(&view, &args)?;
        }
        Command::Export(args) => {
            let view = build_view(&sources, Some(&selection(&args.select, &controls)));
            cmd_export(&view, &args)?;
        }
        Command::Preview(args) => {
            let view = build_view(&sources, None);
            let id = match args.source {
                RawSource::Temperature => SourceId::Temperature,
                RawSource::Disaster => SourceId::Disaster,
            };
            if let Some(panel) = view.previews.iter().find(|p| p.id == id) {
                print_preview(panel, args.rows);
            }
        }
    }
    Ok(())
}

fn resolve_urls(cli: &Cli) -> Result<SourceUrls> {
    let mut urls = SourceUrls::resolve(cli.secrets.as_deref())?;
    let flags = [
        (SourceId::Co2, &cli.url_co2),
        (SourceId::Energy, &cli.url_energy),
        (SourceId::Gdp, &cli.url_gdp),
        (SourceId::Disaster, &cli.url_disaster),
        (SourceId::Temperature, &cli.url_temp),
    ];
    for (id, flag) in flags {
        if let Some(url) = flag {
            urls.set(id, url.clone());
        }
    }
    Ok(urls)
}

/// Fill unset flags from the sidebar defaults.
fn selection(args: &SelectArgs, controls: &Controls) -> Selection {
    Selection {
        country: args
            .country
            .clone()
            .unwrap_or_else(|| controls.default_country.clone()),
        years: YearRange::new(
            args.from.unwrap_or(controls.default_years.start),
            args.until.unwrap_or(controls.default_years.end),
        ),
    }
}

fn styled_table(headers: Vec<&str>) -> TextTable {
    let mut table = TextTable::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            headers
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

fn print_errors(view: &DashboardView) {
    if view.errors.is_empty() {
        return;
    }
    eprintln!("Data load errors (check the source URLs):");
    let mut table = styled_table(vec!["Source", "Error"]);
    for err in &view.errors {
        table.add_row(vec![
            Cell::new(err.id.name()).fg(Color::Red),
            Cell::new(&err.message),
        ]);
    }
    eprintln!("{table}");
}

fn cmd_summary(view: &DashboardView, urls: &SourceUrls) {
    print_errors(view);
    println!("{}", view.headline());
    let mut table = styled_table(vec![
        "Chart", "Rows", "Missing", "Min", "Max", "Mean", "Median",
    ]);
    for chart in &view.charts {
        match &chart.body {
            Panel::Ready(series) => {
                let s = &series.summary;
                table.add_row(vec![
                    Cell::new(&chart.title),
                    Cell::new(series.rows.len()),
                    Cell::new(s.missing),
                    Cell::new(fmt_opt(s.min)),
                    Cell::new(fmt_opt(s.max)),
                    Cell::new(fmt_opt(s.mean)),
                    Cell::new(fmt_opt(s.median)),
                ]);
            }
            Panel::Missing(msg) => {
                table.add_row(vec![
                    Cell::new(&chart.title),
                    Cell::new(msg).fg(Color::Yellow),
                ]);
            }
        }
    }
    println!("{table}");
    println!("{}", config::ATTRIBUTION);
    for (id, url) in urls.entries() {
        println!("  {:<12} {}", id.name(), url);
    }
}

fn cmd_plot(view: &DashboardView, args: &PlotArgs) -> Result<()> {
    print_errors(view);
    std::fs::create_dir_all(&args.out_dir)?;
    let ext = match args.format {
        ImageFormat::Svg => "svg",
        ImageFormat::Png => "png",
    };
    for chart in &view.charts {
        let path = args
            .out_dir
            .join(format!("{}.{}", chart.id.name().to_ascii_lowercase(), ext));
        match viz::plot_chart(
            chart,
            &path,
            args.width,
            args.height,
            &args.locale,
            args.font.as_deref(),
        ) {
            Ok(()) => eprintln!("Wrote {}", path.display()),
            Err(err) => eprintln!("Skipped {}: {:#}", chart.title, err),
        }
    }
    Ok(())
}

fn cmd_export(view: &DashboardView, args: &ExportArgs) -> Result<()> {
    print_errors(view);
    let rows = storage::export_rows(view);
    let fmt = match args.format {
        Some(OutFormat::Csv) => "csv",
        Some(OutFormat::Json) => "json",
        None => args.out.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
    }
    .to_ascii_lowercase();
    match fmt.as_str() {
        "csv" => storage::save_csv(&rows, &args.out)?,
        "json" => storage::save_json(&rows, &args.out)?,
        other => anyhow::bail!("unsupported format: {}", other),
    }
    eprintln!("Saved {} rows to {}", rows.len(), args.out.display());
    Ok(())
}

fn print_preview(panel: &PreviewPanel, rows: usize) {
    println!("{}", panel.title);
    match &panel.body {
        Panel::Ready(preview) => {
            let shown = preview.table.head(rows);
            let mut table =
                styled_table(shown.headers.iter().map(String::as_str).collect());
            for row in &shown.rows {
                table.add_row(row.iter().map(|c| Cell::new(c.to_string())).collect::<Vec<_>>());
            }
            println!("{table}");
            println!("{} of {} rows", shown.height(), preview.total_rows);
        }
        Panel::Missing(msg) => println!("{msg}"),
    }
}
