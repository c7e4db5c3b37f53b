use std::io::Read;
use std::process::ExitCode;

use tmux_namer_core::config::NamerConfig;
use tmux_namer_core::pipeline::{Pipeline, PipelineSettings};
use tmux_namer_core::tmux;
use tmux_namer_core::{CostLog, CostRecord, LlmService, NamerError, TmuxRenamer};
use tracing_subscriber::EnvFilter;

/// Env var holding the tracing filter, e.g. `TMUX_NAMER_LOG=debug`.
const LOG_ENV: &str = "TMUX_NAMER_LOG";

/// Entry point for the tmux-namer-hook binary.
///
/// Reads a Claude Code Stop hook payload from stdin, asks the LLM for a short
/// name, renames the tmux window and appends a line to the cost log.
///
/// CRITICAL: Always exits 0. A non-zero exit could block Claude Code operations.
fn main() -> ExitCode {
    // Set up stderr logging (hooks must not write to stdout)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .compact()
        .init();

    if let Err(e) = run() {
        tracing::warn!("tmux-namer-hook: {e:#}");
    }

    ExitCode::SUCCESS
}

fn run() -> anyhow::Result<()> {
    let config = NamerConfig::load().unwrap_or_else(|e| {
        tracing::warn!("tmux-namer-hook: {e}, using defaults");
        NamerConfig::default()
    });
    let log = CostLog::new(config.cost_log_path());

    // Raw bytes: invalid UTF-8 is reported by the pipeline as malformed input
    let mut input = Vec::new();
    if let Err(e) = std::io::stdin().read_to_end(&mut input) {
        return record_failure(&log, NamerError::Io(e));
    }

    let generator = match LlmService::from_config(&config.llm) {
        Ok(g) => g,
        Err(e) => return record_failure(&log, e),
    };
    let window = tmux::detect_session(&config.tmux, |key| std::env::var(key).ok());
    let pipeline = Pipeline::new(
        generator,
        TmuxRenamer::new(),
        window,
        PipelineSettings::from_config(&config),
    );

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => return record_failure(&log, NamerError::Io(e)),
    };
    let report = rt.block_on(pipeline.run(&input));
    if let Some(name) = &report.name {
        tracing::debug!(renamed = report.renamed, "window name '{name}'");
    }

    if let Some(record) = report.record {
        log.append(&record)?;
        tracing::debug!("appended cost record to {}", log.path().display());
    }

    Ok(())
}

/// Failures before the pipeline runs still get an error line in the cost log.
fn record_failure(log: &CostLog, err: NamerError) -> anyhow::Result<()> {
    tracing::warn!(kind = err.kind(), "{err}");
    log.append(&CostRecord::failed(err.to_string()))?;
    Ok(())
}
