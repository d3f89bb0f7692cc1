//! Implementação dos comandos CLI do kcache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

use crate::driver::{ReplayDriver, ReplayReport, Trace};
use crate::policy::CachePolicyManager;
use crate::types::config::{Config, CONFIG_FILE_NAME};
use crate::KcacheResult;

/// Initializes configuration in the specified directory.
pub async fn init(path: Option<PathBuf>) -> KcacheResult<()> {
    let target_dir = path.unwrap_or_else(|| PathBuf::from("."));

    if !target_dir.exists() {
        std::fs::create_dir_all(&target_dir)?;
        tracing::info!("Directory created: {}", target_dir.display());
    }

    let config_path = target_dir.join(CONFIG_FILE_NAME);

    if config_path.exists() {
        println!("Configuration already exists at: {}", config_path.display());
        println!("Use 'kcache config' to modify.");
        return Ok(());
    }

    let config = Config::default_config();
    config.save(&config_path)?;

    println!("kcache initialized successfully!");
    println!("Configuration created at: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Review the policy: kcache status");
    println!("  2. Configure options: kcache config");
    println!("  3. Replay a trace: kcache replay trace.json");

    Ok(())
}

/// Configura opções interativamente.
pub async fn config_cmd(config_path: &Path) -> KcacheResult<()> {
    use super::interactive::{run_interactive_config, show_config_summary};

    if config_path.exists() {
        let config = Config::load(config_path)?;
        show_config_summary(&config);
    }

    run_interactive_config(config_path)
}

/// Mostra a configuração efetiva da política.
pub async fn status(config: &Config) -> KcacheResult<()> {
    let manager: CachePolicyManager = CachePolicyManager::from_config(&config.cache)?;

    println!("Cache policy\n");
    println!("  match policy:  {}", manager.match_policy_name());
    println!("  aging policy:  {}", manager.aging_policy_name());
    println!("  capacity:      {}", manager.capacity());
    println!("  k_times:       {}", config.cache.k_times);
    println!(
        "  occurrence:    {}",
        match config.cache.occurrence.max_tracked_hashes {
            Some(max) => format!("up to {} hash buckets", max),
            None => "unbounded".to_string(),
        }
    );
    println!(
        "  reset on evict: {}",
        if config.cache.occurrence.reset_on_evict {
            "yes"
        } else {
            "no"
        }
    );
    println!();
    println!("Replay");
    println!("  threads:       {}", config.replay.threads);
    println!("  progress bar:  {}", config.replay.show_progress);

    Ok(())
}

/// Reproduz um trace e imprime o relatório.
pub async fn replay(
    trace_path: &Path,
    threads: Option<usize>,
    json: bool,
    config: &Config,
) -> KcacheResult<()> {
    let trace = Trace::load(trace_path)?;
    tracing::debug!(
        "Trace loaded from {}: {} requests",
        trace_path.display(),
        trace.len()
    );

    let mut driver = ReplayDriver::from_config(config)?;
    if let Some(threads) = threads {
        driver = driver.with_threads(threads);
    }

    let progress = if config.replay.show_progress && !json {
        let pb = ProgressBar::new(trace.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  Replay: [{bar:30}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        let bar = pb.clone();
        driver = driver.with_progress(Arc::new(move |n| bar.inc(n)));
        Some(pb)
    } else {
        None
    };

    let report = driver.run(trace).await?;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &ReplayReport) {
    println!("Replay finished in {} ms\n", report.elapsed_ms);
    println!(
        "  policy:         {} / {}",
        report.match_policy, report.aging_policy
    );
    println!("  requests:       {}", report.requests);
    println!("  threads:        {}", report.threads);
    println!(
        "  hits:           {} ({:.1}%)",
        report.tally.hits,
        report.hit_rate() * 100.0
    );
    println!("  compiles:       {}", report.tally.compiles);
    println!("  admitted:       {}", report.tally.admitted);
    println!("  not eligible:   {}", report.tally.not_eligible);
    println!("  already cached: {}", report.tally.already_cached);
    println!("  evicted:        {}", report.tally.evicted);
    println!(
        "  final depth:    {}/{}",
        report.stats.depth, report.stats.capacity
    );
}

/// Mostra versão.
pub fn version() {
    println!("kcache {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("LRU-K cache policy engine for compiled kernels");
}
