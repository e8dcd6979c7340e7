mod logging;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use lume_core::{
    BatchControl, BatchResult, CancellationToken, LumeConfig, MoveOutcome, MoveStrategy,
    OrganizeOptions, OutcomeStatus, StatsFile,
};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "lume", version, about = "Sort photos and videos into a Year/Month/Category archive")]
struct Cli {
    /// Folder to organize
    source: PathBuf,

    /// Archive root
    dest: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Always copy, verify and delete instead of renaming
    #[arg(long)]
    force_copy: bool,

    /// Lifetime statistics file (overrides the configured one)
    #[arg(long)]
    stats_file: Option<PathBuf>,

    /// Do not read or update lifetime statistics
    #[arg(long, conflicts_with = "stats_file")]
    no_stats: bool,
}

fn display_rel(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}

fn outcome_line(outcome: &MoveOutcome, dest_root: &Path) -> String {
    match outcome.status {
        OutcomeStatus::Moved => format!(
            "moved    {} -> {}{}",
            outcome.original_filename,
            outcome
                .destination
                .as_deref()
                .map(|d| display_rel(d, dest_root))
                .unwrap_or_default(),
            if outcome.source_kept { " (source kept)" } else { "" }
        ),
        OutcomeStatus::Skipped => format!(
            "skipped  {} (already archived as {})",
            outcome.original_filename,
            outcome
                .destination
                .as_deref()
                .map(|d| display_rel(d, dest_root))
                .unwrap_or_default()
        ),
        OutcomeStatus::Failed => format!(
            "failed   {}: {}",
            outcome.original_filename,
            outcome.error_detail.as_deref().unwrap_or("unknown error")
        ),
    }
}

/// Duplicates are not successes; they get their own count.
fn summary_line(result: &BatchResult) -> String {
    let mut line = format!("{} succeeded, {} errors", result.moved, result.failed);
    if result.skipped_duplicates > 0 {
        line.push_str(&format!(", {} duplicates skipped", result.skipped_duplicates));
    }
    line
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let t_total = std::time::Instant::now();

    let config = LumeConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let _log_guard = logging::init_logger(config.log_file.as_deref())?;
    debug!("Configuration: {:?}", config);

    if !cli.source.is_dir() {
        bail!("Source folder does not exist: {}", cli.source.display());
    }
    let (source, dest) = lume_core::scan::validate_roots(&cli.source, &cli.dest)?;

    let mut options = OrganizeOptions::new(&source, &dest).with_config(&config);
    if cli.force_copy {
        options.move_strategy = MoveStrategy::CopyOnly;
    }

    let stats_path = if cli.no_stats {
        None
    } else {
        cli.stats_file.clone().or_else(|| config.stats_file.clone())
    };
    let mut stats_store = stats_path.map(StatsFile::open);

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping after the current file...");
        handler_token.cancel();
    })
    .context("installing Ctrl-C handler")?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let bar = pb.clone();
    let progress = move |stage: &str, current: u64, total: u64, message: &str| {
        bar.set_length(total);
        bar.set_position(current);
        bar.set_message(format!("{}: {}", stage, message));
    };

    let mut control = BatchControl::new().with_cancel_token(token);
    if let Some(store) = stats_store.as_mut() {
        control = control.with_stats(store);
    }
    let result = lume_core::organize_with_control(&options, control, &progress);
    pb.finish_and_clear();
    let result = result?;

    for outcome in &result.outcomes {
        println!("{}", outcome_line(outcome, &dest));
    }

    if let Some(store) = &stats_store {
        let stats = store.stats();
        println!(
            "Lifetime: {} files ({}) organized in {} batches",
            stats.total_files,
            HumanBytes(stats.total_size),
            stats.total_batches
        );
    }

    if let Some(report) = result.failure_report(config.max_error_display) {
        eprintln!("Failures:\n{}", report.trim_end());
    }
    if result.cancelled {
        eprintln!("Cancelled; remaining files were left in place.");
    }

    println!(
        "{} ({} moved, {:.2}s)",
        summary_line(&result),
        HumanBytes(result.bytes_moved),
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}
