//! Console and JSON reporting

use std::fmt::Write as _;
use std::path::Path;

use costsim_core::Result;

use crate::harness::{ComparisonReport, ScenarioResult};

const INDENT: &str = "    ";

/// Format with at most two decimals, dropping trailing zeros (`2.10` -> `2.1`,
/// `4.00` -> `4`)
pub fn format_amount(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let text = format!("{:.2}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Per-job table for one scenario, followed by its total cost line.
///
/// Only successful jobs are listed; failed ones are summarized in a count.
pub fn render_scenario(result: &ScenarioResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out);
    let _ = writeln!(out, "========== OUTPUT: {} ({}) ==========", result.name, result.policy_name);
    let _ = writeln!(
        out,
        "Job ID{i}STATUS{i}Resource ID{i}Time{i}Start Time{i}Finish Time",
        i = INDENT
    );

    for outcome in result.outcomes.iter().filter(|o| o.is_success()) {
        let _ = writeln!(
            out,
            "{i}{:<8}{:<11}{:<15}{:<8}{:<14}{}",
            outcome.job_id,
            outcome.status,
            outcome.resource_id,
            format_amount(outcome.elapsed().unwrap_or_default()),
            format_amount(outcome.start_time),
            format_amount(outcome.finish_time.unwrap_or_default()),
            i = INDENT
        );
    }

    let failed = result.failed_jobs();
    if failed > 0 {
        let _ = writeln!(out, "({} of {} jobs did not complete)", failed, result.total_jobs());
    }

    let _ = writeln!(out, "Total cost: ${}", format_amount(result.total_cost));
    out
}

/// Both scenario tables plus the savings summary
pub fn render_comparison(report: &ComparisonReport) -> String {
    let mut out = String::new();
    out.push_str(&render_scenario(&report.cost_aware));
    out.push_str(&render_scenario(&report.naive));

    let _ = writeln!(out);
    let _ = writeln!(out, "========== SAVINGS ==========");
    let _ = writeln!(
        out,
        "{:<20} {:>10} {:>12}",
        "Scenario", "Cost ($)", "Resources"
    );
    for result in [&report.cost_aware, &report.naive] {
        let _ = writeln!(
            out,
            "{:<20} {:>10} {:>8}/{:<3}",
            result.name,
            format_amount(result.total_cost),
            result.activated_resources.len(),
            result.resources.len()
        );
    }
    let _ = writeln!(
        out,
        "Savings ({} vs {}): ${} ({}%)",
        report.cost_aware.name,
        report.naive.name,
        format_amount(report.savings),
        format_amount(report.savings_pct)
    );
    out
}

/// Write the full report as pretty JSON
pub fn write_json(report: &ComparisonReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}
