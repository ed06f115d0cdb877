// capvalue entry point.
//
// Startup sequence:
// 1. Parse arguments, initialize tracing
// 2. Load config (copying defaults on first run)
// 3. Load input tables and run the pipeline
// 4. Write the scored CSV (and optional JSON summary)
// 5. Print the bargain / overpaid report

use capvalue_core::config::{self, resolve_path, Config};
use capvalue_core::export;
use capvalue_core::pipeline;
use capvalue_core::positions::PositionGroup;
use capvalue_core::scoring::{top_bargains, top_overpaid, GroupSummary, ScoredPlayerSeason};

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[clap(
    name = "capvalue",
    about = "Score NFL player-seasons on production relative to contract cost"
)]
struct Cli {
    /// Project root holding config/, defaults/ and the data files.
    #[clap(long, default_value = ".")]
    base_dir: PathBuf,

    /// Explicit config file (skips copying defaults into config/).
    #[clap(long)]
    config: Option<PathBuf>,

    /// Scored CSV destination (overrides `[output] path`).
    #[clap(long, short)]
    output: Option<PathBuf>,

    /// Rows per report table.
    #[clap(long, short = 'n', default_value_t = 15)]
    top: usize,

    /// Restrict the report to one position group: `-p WR`.
    #[clap(long, short = 'p')]
    position: Option<PositionGroup>,

    /// Log to logs/capvalue.log instead of stderr.
    #[clap(long)]
    log_file: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize tracing
    init_tracing(&cli)?;
    info!("capvalue starting up");

    // 2. Load config
    let mut config = load_config(&cli)?;
    config.data_paths = config.data_paths.resolve_against(&cli.base_dir);
    info!(
        "Config loaded: seasons {}-{}, weights {}, min {} snaps",
        config.seasons.first,
        config.seasons.last,
        config.weights.version(),
        config.merge.min_snaps
    );

    // 3. Load inputs and run the pipeline
    let output = pipeline::run_from_paths(&config).context("value scoring pipeline failed")?;

    // 4. Write outputs
    let csv_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(resolve_path(&cli.base_dir, &config.output.path)));
    export::write_scored_csv_file(&csv_path, &output.scored)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;
    info!("Wrote {} scored rows to {}", output.scored.len(), csv_path.display());

    let summary = export::summarize(&output);
    if let Some(path) = config.output.summary_path.as_deref() {
        let path = PathBuf::from(resolve_path(&cli.base_dir, path));
        export::write_summary_json(&path, &summary)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Wrote run summary to {}", path.display());
    }

    // 5. Report
    println!(
        "{} merged player-seasons, {} analysis-ready, {} scored (weights {})",
        summary.merged_rows,
        summary.analysis_ready_rows,
        summary.scored_rows,
        summary.weights_version
    );
    print_group_summary(&summary.groups);

    let scope = cli
        .position
        .map(|g| g.to_string())
        .unwrap_or_else(|| "all positions".to_string());
    print_ranking(
        &format!("Top {} bargains ({scope})", cli.top),
        &top_bargains(&output.scored, cli.position, cli.top),
    );
    print_ranking(
        &format!("Top {} overpaid ({scope})", cli.top),
        &top_overpaid(&output.scored, cli.position, cli.top),
    );

    info!("capvalue finished");
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => config::load_config_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => config::load_config(&cli.base_dir).context("failed to load configuration"),
    }
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    v.map(|x| format!("{x:.precision$}"))
        .unwrap_or_else(|| "-".to_string())
}

fn print_group_summary(groups: &[GroupSummary]) {
    println!();
    println!(
        "{:<4} {:>7} {:>10} {:>10} {:>9} {:>9}",
        "POS", "players", "mean cap%", "mean value", "bargains", "overpaid"
    );
    for g in groups {
        println!(
            "{:<4} {:>7} {:>10} {:>10} {:>9} {:>9}",
            g.pos_group.as_str(),
            g.players,
            fmt_opt(g.mean_apy_cap_pct.map(|p| p * 100.0), 2),
            fmt_opt(g.mean_value_score, 3),
            g.bargains,
            g.overpaid
        );
    }
}

fn print_ranking(title: &str, rows: &[&ScoredPlayerSeason]) {
    println!();
    println!("{title}");
    if rows.is_empty() {
        println!("  (no scored players)");
        return;
    }
    println!(
        "  {:<26} {:<4} {:<4} {:>6} {:>7} {:>7} {:>7} {:>7}",
        "player", "pos", "team", "season", "cap%", "perf", "salary", "value"
    );
    for r in rows {
        let rec = &r.record;
        println!(
            "  {:<26} {:<4} {:<4} {:>6} {:>7} {:>7} {:>7} {:>7}",
            rec.player_name.as_deref().unwrap_or(&rec.player_id),
            rec.pos_group.as_str(),
            rec.recent_team.as_deref().unwrap_or("-"),
            rec.season,
            fmt_opt(rec.apy_cap_pct().map(|p| p * 100.0), 2),
            fmt_opt(r.performance_zscore, 2),
            fmt_opt(r.salary_zscore, 2),
            fmt_opt(r.value_score, 2)
        );
    }
}

/// Initialize tracing to stderr, or to `logs/capvalue.log` under the base
/// dir with `--log-file`. Stdout is reserved for the report.
fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("capvalue=info,capvalue_core=info,warn"));

    if cli.log_file {
        let log_dir = cli.base_dir.join("logs");
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("failed to create {}", log_dir.display()))?;
        let log_file = std::fs::File::create(log_dir.join("capvalue.log"))
            .context("failed to create log file")?;
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set tracing subscriber")?;
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set tracing subscriber")?;
    }

    Ok(())
}
