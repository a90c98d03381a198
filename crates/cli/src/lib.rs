//! Filmstrip demo driver
//!
//! Headless stand-in for the list widget: loads a catalog, plugs real
//! stage functions into the scheduler (filesystem fetch, sepia-tone
//! transform), and slides a visible window across the item list the
//! way a scrolling viewport would — suspending the queues while
//! "scrolling", reconciling when settled, and pumping completions.

use anyhow::{Context, Result};
use clap::Parser;
use filmstrip_core::{
    parse_catalog, ItemId, ItemState, ListPresenter, Scheduler, SchedulerConfig, StageFunctions,
};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Parser)]
#[command(name = "filmstrip")]
#[command(about = "Run the two-stage photo pipeline over a catalog")]
pub struct Cli {
    /// Catalog file: a JSON array of {"name", "source"} entries
    #[arg(value_name = "CATALOG")]
    catalog: PathBuf,

    /// Worker threads for the fetch stage
    #[arg(long, default_value_t = 2)]
    fetch_workers: usize,

    /// Worker threads for the transform stage
    #[arg(long, default_value_t = 2)]
    transform_workers: usize,

    /// Number of rows visible at once
    #[arg(long, default_value_t = 4)]
    window: usize,

    /// Directory to write processed images into
    #[arg(long)]
    out: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Presenter that logs row updates as they are committed
struct RowLogger;

impl ListPresenter for RowLogger {
    fn item_updated(&self, id: ItemId) {
        log::debug!("row {} updated", id);
    }
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.verbose);

    if cli.window == 0 {
        anyhow::bail!("--window must be >= 1");
    }

    let json = fs::read_to_string(&cli.catalog)
        .with_context(|| format!("failed to read catalog {}", cli.catalog.display()))?;
    let entries = parse_catalog(&json).context("failed to parse catalog")?;

    // Source locators are resolved relative to the catalog file.
    let base = cli
        .catalog
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let stages = StageFunctions::new(
        move |source: &str| {
            let path = base.join(source);
            fs::read(&path).map_err(|err| format!("{}: {}", path.display(), err))
        },
        |raw: &[u8]| sepia_png(raw),
    );

    let config = SchedulerConfig {
        fetch_workers: cli.fetch_workers,
        transform_workers: cli.transform_workers,
        ..SchedulerConfig::default()
    };
    let mut scheduler = Scheduler::new(config, stages, Arc::new(RowLogger));
    scheduler.catalog_loaded(entries);

    let total = scheduler.len();
    println!("{} item(s) in catalog", total);

    for start in (0..total).step_by(cli.window) {
        let end = (start + cli.window).min(total);
        let visible: HashSet<ItemId> = (start..end).map(|i| i as ItemId).collect();

        // A real presenter would fire these around scroll gestures.
        scheduler.viewport_started_moving();
        scheduler.viewport_settled(&visible);

        settle_window(&mut scheduler, &visible)?;

        for id in start..end {
            if let Some(record) = scheduler.record(id as ItemId) {
                println!("  [{}] {} — {}", id, record.name(), describe(record.state()));
            }
        }
    }

    if let Some(out) = &cli.out {
        write_outputs(&scheduler, out)?;
    }

    scheduler.shutdown();
    Ok(())
}

/// Pump completions until every visible row is terminal
///
/// Re-reconciles after each batch of completions so items that just
/// reached `RawReady` get their transform admitted, the same way a
/// redrawn row re-enters the scheduler in a real list.
fn settle_window(scheduler: &mut Scheduler, visible: &HashSet<ItemId>) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(60);

    loop {
        let done = visible.iter().all(|id| {
            scheduler
                .record(*id)
                .map(|record| record.state().is_terminal())
                .unwrap_or(true)
        });
        if done {
            return Ok(());
        }
        if Instant::now() > deadline {
            anyhow::bail!("timed out waiting for visible rows to finish");
        }
        if scheduler.pump_wait(Duration::from_millis(100)) > 0 {
            scheduler.reconcile(visible);
        }
    }
}

fn describe(state: ItemState) -> &'static str {
    match state {
        ItemState::New | ItemState::RawReady => "loading",
        ItemState::Processed => "processed",
        ItemState::Failed => "failed",
    }
}

fn write_outputs(scheduler: &Scheduler, out: &Path) -> Result<()> {
    fs::create_dir_all(out)
        .with_context(|| format!("failed to create output directory {}", out.display()))?;

    let mut written = 0;
    for record in scheduler.items() {
        if let Some(processed) = record.processed_content() {
            let file_name = format!("{:03}-{}.png", record.id(), sanitize(record.name()));
            let path = out.join(file_name);
            fs::write(&path, processed)
                .with_context(|| format!("failed to write {}", path.display()))?;
            written += 1;
        }
    }

    println!("wrote {} processed image(s) to {}", written, out.display());
    Ok(())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}

/// Decode an image, apply a sepia tone, re-encode as PNG
///
/// The classic sepia matrix, clamped per channel.
pub fn sepia_png(raw: &[u8]) -> Result<Vec<u8>, String> {
    let decoded = image::load_from_memory(raw).map_err(|err| err.to_string())?;
    let mut rgb = decoded.to_rgb8();

    for pixel in rgb.pixels_mut() {
        let [r, g, b] = pixel.0;
        let (r, g, b) = (r as f32, g as f32, b as f32);
        pixel.0 = [
            (0.393 * r + 0.769 * g + 0.189 * b).min(255.0) as u8,
            (0.349 * r + 0.686 * g + 0.168 * b).min(255.0) as u8,
            (0.272 * r + 0.534 * g + 0.131 * b).min(255.0) as u8,
        ];
    }

    let mut out = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|err| err.to_string())?;
    Ok(out)
}
