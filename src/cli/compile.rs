//! Commands that run the cache pool pass over a container description

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use super::output::Output;
use crate::config::PassConfig;
use crate::domain::Value;
use crate::duration;
use crate::pass::{CachePoolPass, PassReport, PoolSummary};
use crate::registry::{loader, Registry};

fn run_pass(file: &Path, config: PassConfig) -> Result<(Registry, PassReport)> {
    let mut registry = loader::load_file(file)
        .with_context(|| format!("Failed to load container: {}", file.display()))?;
    tracing::debug!(file = %file.display(), components = registry.len(), "loaded container");

    let report = CachePoolPass::new(config)
        .process(&mut registry)
        .with_context(|| format!("Cache pool pass failed for {}", file.display()))?;

    Ok((registry, report))
}

/// Runs the pass and prints (or writes) the resulting container
pub fn compile(output: &Output, config: PassConfig, file: &Path, out_file: Option<&Path>) -> Result<()> {
    let (registry, report) = run_pass(file, config)?;
    let dumped = loader::to_json(&registry);

    if let Some(out_file) = out_file {
        let content = serde_json::to_string_pretty(&dumped).context("Failed to serialize container")?;
        fs::write(out_file, content)
            .with_context(|| format!("Failed to write container: {}", out_file.display()))?;

        output.success(&format!(
            "Wired {} cache pools into {}",
            report.pools.len(),
            out_file.display()
        ));
        return Ok(());
    }

    if output.is_json() {
        output.data(&dumped);
        return Ok(());
    }

    output.success(&format!(
        "Wired {} cache pools ({} clearers, {} connections)",
        report.pools.len(),
        report.clearers.len(),
        report.connections.len()
    ));
    for (clearer, pools) in &report.clearers {
        let names = pools.join(", ");
        output.row(&[clearer.as_str(), names.as_str()]);
    }
    for connection in &report.connections {
        output.row(&["connection", connection.as_str()]);
    }
    if report.early_expiration_handler_kept {
        output.row(&["early expiration", "enabled"]);
    }

    Ok(())
}

fn lifetime_label(summary: &PoolSummary) -> String {
    match &summary.default_lifetime {
        None => "-".to_string(),
        Some(value) => match duration::normalize(value) {
            Ok(seconds) => format!("{}s", seconds),
            Err(_) => describe(value),
        },
    }
}

fn describe(value: &Value) -> String {
    value.to_plain_string().unwrap_or_else(|| format!("{:?}", value))
}

/// Lists every wired pool
pub fn pools(output: &Output, config: PassConfig, file: &Path) -> Result<()> {
    let (_, report) = run_pass(file, config)?;

    if output.is_json() {
        let items: Vec<_> = report
            .pools
            .iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "name": p.name,
                    "adapter": p.adapter.as_str(),
                    "namespace": p.namespace,
                    "provider": p.provider,
                    "clearer": p.clearer,
                    "default_lifetime": p
                        .default_lifetime
                        .as_ref()
                        .and_then(|v| duration::normalize(v).ok()),
                    "early_expiration": p.early_expiration,
                })
            })
            .collect();
        output.data(&items);
        return Ok(());
    }

    if report.pools.is_empty() {
        output.success("No cache pools found");
        return Ok(());
    }

    output.heading(&format!("Cache pools ({})", report.pools.len()));
    for pool in &report.pools {
        let lifetime = lifetime_label(pool);
        output.row(&[
            pool.name.as_str(),
            pool.id.as_str(),
            pool.adapter.as_str(),
            pool.namespace.as_deref().unwrap_or("-"),
            pool.clearer.as_deref().unwrap_or("-"),
            lifetime.as_str(),
        ]);
    }
    output.blank();

    Ok(())
}
