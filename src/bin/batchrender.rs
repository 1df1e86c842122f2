use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context as _;
use batchrender::{
    BatchError, ColorMode, FileFormat, LoadOptions, Plan, PreviewScene, RenderOverrides,
    RunOptions, RunReport, SceneHost,
};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "batchrender",
    version,
    about = "Render every variation of a scene plan, one output image per variation"
)]
struct Cli {
    /// YAML (or JSON) plan file.
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Override the baseline scene path.
    #[arg(long)]
    blend: Option<PathBuf>,

    /// Override the render output directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log planned changes without touching the scene host.
    #[arg(long)]
    dry_run: bool,

    /// Samples per pixel.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    samples: Option<u32>,

    /// Horizontal resolution.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    resolution_x: Option<u32>,

    /// Vertical resolution.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    resolution_y: Option<u32>,

    /// Render engine name passed to the host.
    #[arg(long)]
    engine: Option<String>,

    /// Output image format.
    #[arg(long, value_enum)]
    file_format: Option<FormatChoice>,

    /// Output color mode.
    #[arg(long, value_enum)]
    color_mode: Option<ColorChoice>,

    /// Disable the denoiser.
    #[arg(long)]
    no_denoise: bool,

    /// Camera object that camera edits without a name apply to.
    #[arg(long)]
    camera: Option<String>,

    /// Append `<light>_on` / `<light>_off` variations toggling this light.
    #[arg(long)]
    light_name: Option<String>,

    /// Write a JSON run report here.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Dump the baseline scene inventory as JSON to PATH and exit.
    #[arg(long, value_name = "PATH", conflicts_with = "dry_run")]
    inventory: Option<PathBuf>,

    /// Include hidden objects in the inventory.
    #[arg(long, requires = "inventory")]
    include_hidden: bool,

    /// More logging (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Png,
    Jpeg,
    Tiff,
    Exr,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ColorChoice {
    Bw,
    Rgb,
    Rgba,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };
    init_tracing(cli.verbose, cli.quiet);

    let opts = load_options(&cli);
    let plan = match resolve_plan(&cli, &opts) {
        Ok(plan) => plan,
        Err(e) => {
            tracing::error!("failed to load plan: {e}");
            return exit_with(e.exit_code());
        }
    };

    if let Some(path) = &cli.inventory {
        return match cmd_inventory(&plan, path, cli.include_hidden) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("{e:#}");
                exit_with(2)
            }
        };
    }

    if cli.dry_run {
        match batchrender::plan_to_yaml(&plan) {
            Ok(yaml) => tracing::debug!("resolved plan:\n{yaml}"),
            Err(e) => tracing::debug!("could not dump resolved plan: {e}"),
        }
    }

    let mut host = PreviewScene::new();
    let host: Option<&mut dyn SceneHost> = if cli.dry_run { None } else { Some(&mut host) };
    let report = match batchrender::run_plan(&plan, host, &RunOptions { dry_run: cli.dry_run }) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("run aborted: {e}");
            return exit_with(e.exit_code());
        }
    };

    if let Some(path) = &cli.report {
        if let Err(e) = write_report(&report, path) {
            tracing::error!("{e:#}");
            return exit_with(2);
        }
    }

    summarize(&report);
    exit_with(report.exit_code())
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_options(cli: &Cli) -> LoadOptions {
    LoadOptions {
        blend_override: cli.blend.clone(),
        output_override: cli.output.clone(),
        camera_name: cli.camera.clone(),
        render: RenderOverrides {
            engine: cli.engine.clone(),
            samples: cli.samples,
            resolution_x: cli.resolution_x,
            resolution_y: cli.resolution_y,
            use_denoise: cli.no_denoise.then_some(false),
            file_format: cli.file_format.map(|f| match f {
                FormatChoice::Png => FileFormat::Png,
                FormatChoice::Jpeg => FileFormat::Jpeg,
                FormatChoice::Tiff => FileFormat::Tiff,
                FormatChoice::Exr => FileFormat::OpenExr,
            }),
            color_mode: cli.color_mode.map(|c| match c {
                ColorChoice::Bw => ColorMode::Bw,
                ColorChoice::Rgb => ColorMode::Rgb,
                ColorChoice::Rgba => ColorMode::Rgba,
            }),
        },
        extra_variations: cli
            .light_name
            .as_deref()
            .map(batchrender::light_toggle_variations)
            .unwrap_or_default(),
    }
}

fn resolve_plan(cli: &Cli, opts: &LoadOptions) -> Result<Plan, BatchError> {
    match &cli.plan {
        Some(path) => batchrender::load_plan_with(path, opts),
        None if cli.light_name.is_some() || cli.inventory.is_some() => {
            batchrender::plan_from_options(opts)
        }
        None => Err(BatchError::validation(
            "--plan is required unless --light-name or --inventory is given",
        )),
    }
}

fn cmd_inventory(plan: &Plan, out: &Path, include_hidden: bool) -> anyhow::Result<()> {
    let mut host = PreviewScene::new();
    host.load_scene(&plan.defaults.blend_path)?;
    let entries = host.inventory(include_hidden)?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create inventory dir '{}'", parent.display()))?;
    }
    let f = File::create(out).with_context(|| format!("create '{}'", out.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(f), &entries)
        .with_context(|| format!("write inventory '{}'", out.display()))?;
    eprintln!("wrote {} ({} objects)", out.display(), entries.len());
    Ok(())
}

fn write_report(report: &RunReport, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create report dir '{}'", parent.display()))?;
    }
    let f = File::create(out).with_context(|| format!("create '{}'", out.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(f), report)
        .with_context(|| format!("write report '{}'", out.display()))?;
    Ok(())
}

fn summarize(report: &RunReport) {
    let done: Vec<&str> = report.completed().collect();
    let failed: Vec<&str> = report.not_completed().collect();
    let verb = if report.simulated { "simulated" } else { "rendered" };
    eprintln!("{verb} {} of {} variations", done.len(), report.outcomes.len());
    if !failed.is_empty() {
        eprintln!("failed variations: {}", failed.join(", "));
    }
}

fn exit_with(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
