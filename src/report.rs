// src/report.rs
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::config::Settings;
use crate::error::FarmResult;
use crate::types::{JobResult, Report, RunTotals, SavedReport};

/// Sum success/fail counters over every job in the report.
pub fn totals(report: &Report) -> RunTotals {
    let mut totals = RunTotals::default();
    for entry in report.entries() {
        totals.success += u64::from(entry.success);
        totals.fail += u64::from(entry.fail);
    }
    totals
}

/// Group results by wallet ordinal, networks sorted within each group.
pub fn by_wallet(report: &Report) -> BTreeMap<u32, Vec<&JobResult>> {
    let mut grouped: BTreeMap<u32, Vec<&JobResult>> = BTreeMap::new();
    for entry in report.entries() {
        grouped.entry(entry.wallet_ordinal).or_default().push(entry);
    }
    for entries in grouped.values_mut() {
        entries.sort_by_key(|e| e.network.key());
    }
    grouped
}

/// Human-readable summary of a finished run, one line per job plus totals.
pub fn render(report: &Report) -> String {
    if report.is_empty() {
        return "No transfer results recorded yet.".to_string();
    }

    let mut out = String::from("Transfer run results\n");
    for (ordinal, entries) in by_wallet(report) {
        let address = entries[0].wallet_address;
        out.push_str(&format!("\nWallet #{ordinal} ({address})\n"));
        for entry in entries {
            out.push_str(&format!(
                "  {:<12} ok {:>4} | failed {:>4} | {}s\n",
                entry.network.name(),
                entry.success,
                entry.fail,
                entry.duration_secs,
            ));
        }
    }

    let totals = totals(report);
    out.push_str(&format!(
        "\nTotal: ok {} | failed {}\n",
        totals.success, totals.fail
    ));
    out
}

/// Write the report plus the settings it ran under to a timestamped JSON
/// file inside `dir`. Returns the path of the file written.
pub fn persist(report: &Report, settings: &Settings, dir: &Path) -> FarmResult<PathBuf> {
    let saved = SavedReport {
        generated_at: Utc::now(),
        settings: settings.clone(),
        results: report.clone(),
    };

    let path = dir.join(format!("farm-report-{}.json", Utc::now().timestamp_millis()));
    let json = serde_json::to_string_pretty(&saved)?;
    std::fs::write(&path, json)?;

    tracing::info!(path = %path.display(), "run report saved");
    Ok(path)
}
