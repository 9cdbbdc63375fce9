use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::identity;
use crate::models::{timestamp, Metadata, Snapshot, TrackedJob};

pub fn default_path() -> PathBuf {
    // Use XDG data directory or fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobwatch") {
        proj_dirs.data_dir().join("tracked_jobs.json")
    } else {
        PathBuf::from("tracked_jobs.json")
    }
}

/// Entry shape of the old flat store: id -> job, no lifecycle fields.
#[derive(Debug, Deserialize)]
struct LegacyJob {
    #[serde(default)]
    company: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    department: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    found_date: Option<String>,
}

/// Load the persisted snapshot. A missing file is an empty snapshot; a
/// corrupt one is discarded with a warning rather than halting monitoring.
/// Legacy flat stores (no top-level "jobs" key) are migrated transparently.
pub fn load(path: &Path, now: DateTime<Utc>) -> Result<Snapshot> {
    if !path.exists() {
        return Ok(Snapshot::empty());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job store: {}", path.display()))?;

    match parse_snapshot(&raw, now) {
        Ok(snapshot) => Ok(snapshot),
        Err(e) => {
            eprintln!(
                "Warning: job store {} is unreadable ({}); starting from an empty snapshot",
                path.display(),
                e
            );
            Ok(Snapshot::empty())
        }
    }
}

fn parse_snapshot(raw: &str, now: DateTime<Utc>) -> Result<Snapshot> {
    let value: Value = serde_json::from_str(raw).context("invalid JSON")?;
    if value.get("jobs").is_some() {
        serde_json::from_value(value).context("malformed snapshot")
    } else {
        migrate_legacy(value, now)
    }
}

/// Migration defaults: every legacy job is assumed still present (active) but
/// not new, seen as of now. Identities are recomputed from the job fields so
/// the whole store uses the current hashing scheme; the old keys are dropped.
fn migrate_legacy(value: Value, now: DateTime<Utc>) -> Result<Snapshot> {
    // BTreeMap keeps migrated output order deterministic.
    let entries: BTreeMap<String, LegacyJob> =
        serde_json::from_value(value).context("malformed legacy store")?;

    let jobs: Vec<TrackedJob> = entries
        .into_values()
        .map(|legacy| {
            let id = identity::id_for(&legacy.company, &legacy.title, &legacy.department);
            let found_date = legacy
                .found_date
                .as_deref()
                .and_then(timestamp::parse)
                .unwrap_or(now);
            TrackedJob {
                id,
                company: legacy.company,
                title: legacy.title,
                department: legacy.department,
                location: legacy.location,
                link: legacy.link,
                found_date,
                last_seen: now,
                is_active: true,
                is_new: false,
            }
        })
        .collect();

    let metadata = Metadata::compute(&jobs, now);
    Ok(Snapshot { jobs, metadata })
}

/// Write-then-rename so a crash mid-save never leaves a truncated store as
/// the canonical file.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let raw = serde_json::to_string_pretty(snapshot).context("Failed to serialize job store")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, raw)
        .with_context(|| format!("Failed to write job store: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace job store: {}", path.display()))?;
    Ok(())
}
