mod annotate;
mod capture_target;
mod console;
#[cfg(feature = "opencv")]
mod video;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use shiftwatch::{FrameSource, ImageSequenceSource, MonitorConfig, MultiSourceMonitor, Report, SessionJob};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::annotate::AnnotatedFrameWriter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Measure worker activity and idle time from fixed-camera footage"
)]
struct Args {
    /// Directory of still frames to replay in file-name order. Repeat for several sources.
    #[arg(long = "source", value_name = "PATH", num_args = 1..)]
    sources: Vec<PathBuf>,

    /// Video file or camera index read through OpenCV. Repeat for several sources.
    #[cfg(feature = "opencv")]
    #[arg(long = "video", value_name = "PATH|INDEX")]
    videos: Vec<String>,

    /// TOML configuration file. Flags below override its values.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Session length in seconds.
    #[arg(long, value_name = "SECS")]
    duration: Option<u64>,

    /// Percentage of a blob's box that must be moving for it to count as active.
    #[arg(long, value_name = "PERCENT")]
    motion_threshold: Option<f64>,

    /// Seconds of continuous idleness before idle time starts accruing.
    #[arg(long, value_name = "SECS")]
    idle_threshold: Option<f64>,

    /// Minimum contour area in pixels.
    #[arg(long, value_name = "PIXELS")]
    min_area: Option<f64>,

    /// Write the JSON report to FILE (`-` for stdout). Several sources get `_<index>` suffixes,
    /// except on stdout, where they are written as one JSON array.
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write the per-worker table as CSV to FILE. Several sources get `_<index>` suffixes.
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Write annotated PNG frames into DIR.
    #[arg(long, value_name = "DIR")]
    annotate_dir: Option<PathBuf>,

    /// Annotate only every N-th frame.
    #[arg(long, value_name = "N", default_value_t = 1)]
    annotate_every: u64,

    /// Skip the console report.
    #[arg(long, short)]
    quiet: bool,

    /// Enable debug logging.
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = build_config(&args)?;
    let jobs = build_jobs(&args)?;
    let source_count = jobs.len();

    let monitor = MultiSourceMonitor::new(config);
    let stop = monitor.stop_signal();
    ctrlc::set_handler(move || {
        log::info!("Ctrl-C received, finishing current frames");
        stop.request_stop();
    })
    .context("failed to install Ctrl-C handler")?;

    let results = monitor.run(jobs).await;

    // One failed write or source never stops the remaining reports.
    let mut failures: Vec<(String, anyhow::Error)> = Vec::new();
    let mut stdout_reports = Vec::new();
    for (index, (name, result)) in results.into_iter().enumerate() {
        match result {
            Ok(report) => {
                let suffix = (source_count > 1).then_some(index);
                for e in emit(&args, &report, &name, suffix) {
                    failures.push((name.clone(), e));
                }
                if writes_to_stdout(&args) {
                    stdout_reports.push((name, report));
                }
            }
            Err(e) => {
                let context = format!("monitoring {name} failed");
                failures.push((name, anyhow::Error::new(e).context(context)));
            }
        }
    }

    if writes_to_stdout(&args) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = write_stdout_json(&mut stdout, &stdout_reports, source_count > 1) {
            failures.push(("stdout".to_string(), e));
        }
    }

    match failures.len() {
        0 => Ok(()),
        1 => Err(failures.remove(0).1),
        n => {
            for (name, e) in &failures {
                log::error!("{name}: {e:#}");
            }
            bail!("{n} failures across {source_count} sources")
        }
    }
}

/// Defaults, then the optional config file, then flags. Validated last.
fn build_config(args: &Args) -> Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => MonitorConfig::default(),
    };

    if let Some(secs) = args.duration {
        config.session.duration_secs = secs;
    }
    if let Some(threshold) = args.motion_threshold {
        config.detection.motion_threshold = threshold;
    }
    if let Some(secs) = args.idle_threshold {
        config.timing.idle_threshold_secs = secs;
    }
    if let Some(area) = args.min_area {
        config.detection.min_area = area;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn build_jobs(args: &Args) -> Result<Vec<SessionJob>> {
    let mut sources: Vec<Box<dyn FrameSource + Send>> = args
        .sources
        .iter()
        .map(|dir| Box::new(ImageSequenceSource::new(dir)) as Box<dyn FrameSource + Send>)
        .collect();

    #[cfg(feature = "opencv")]
    sources.extend(
        args.videos
            .iter()
            .map(|target| Box::new(video::VideoSource::new(target.as_str())) as Box<dyn FrameSource + Send>),
    );

    if sources.is_empty() {
        bail!("no input given; pass at least one --source <PATH>");
    }

    let multiple = sources.len() > 1;
    let mut jobs = Vec::with_capacity(sources.len());
    for (index, source) in sources.drain(..).enumerate() {
        let mut job = SessionJob::new(source);
        if let Some(dir) = &args.annotate_dir {
            let dir = if multiple { dir.join(format!("source_{index}")) } else { dir.clone() };
            let writer = AnnotatedFrameWriter::create(&dir, args.annotate_every)
                .with_context(|| format!("failed to create annotation directory {}", dir.display()))?;
            job = job.with_observer(Box::new(writer));
        }
        jobs.push(job);
    }
    Ok(jobs)
}

fn writes_to_stdout(args: &Args) -> bool {
    args.output.as_deref() == Some(Path::new("-"))
}

/// Console summary plus file outputs for one report. Every failed write is
/// returned; none of them stops the others.
fn emit(args: &Args, report: &Report, name: &str, suffix: Option<usize>) -> Vec<anyhow::Error> {
    let mut errors = Vec::new();

    if !args.quiet && !writes_to_stdout(args) {
        print!("{}", console::render(report, name));
    }

    if let Some(path) = args.output.as_deref().filter(|_| !writes_to_stdout(args)) {
        let path = output_path(path, suffix);
        if let Err(e) = report.write_json(&path) {
            errors.push(anyhow::Error::new(e).context(format!("failed to write report {}", path.display())));
        }
    }

    if let Some(path) = &args.csv {
        let path = output_path(path, suffix);
        if let Err(e) = report.write_csv(&path) {
            errors.push(anyhow::Error::new(e).context(format!("failed to write CSV {}", path.display())));
        }
    }

    errors
}

#[derive(Serialize)]
struct SourceReport<'a> {
    source: &'a str,
    #[serde(flatten)]
    report: &'a Report,
}

/// One source writes its report object. Several write a single array, each
/// entry tagged with its `source`.
fn write_stdout_json<W: Write>(mut out: W, reports: &[(String, Report)], several: bool) -> Result<()> {
    let written = if several {
        let tagged: Vec<SourceReport<'_>> = reports
            .iter()
            .map(|(source, report)| SourceReport { source, report })
            .collect();
        serde_json::to_writer_pretty(&mut out, &tagged)
    } else if let Some((_, report)) = reports.first() {
        serde_json::to_writer_pretty(&mut out, report)
    } else {
        return Ok(());
    };
    written.context("failed to write report to stdout")?;
    writeln!(out).context("failed to write report to stdout")?;
    Ok(())
}

fn output_path(path: &Path, suffix: Option<usize>) -> PathBuf {
    match suffix {
        Some(index) => indexed_path(path, index),
        None => path.to_path_buf(),
    }
}

/// `report.json` -> `report_2.json`.
fn indexed_path(path: &Path, index: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{index}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{index}"),
    };
    path.with_file_name(name)
}
