use std::collections::HashMap;
use std::fmt::Write;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::models::{Provider, Report, ReportRecord, UNKNOWN_LICENSE};

const SHORT_HASH: usize = 7;

/// Render a colored terminal report.
///
/// Dependencies with a license gap or a newer upstream commit are always
/// listed; `verbose` lists every dependency.
pub fn render(report: &Report, verbose: bool, quiet: bool) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let deps = &report.dependencies;

    let gaps: Vec<&ReportRecord> = deps.iter().filter(|d| is_license_gap(d)).collect();
    let outdated: Vec<&ReportRecord> = deps.iter().filter(|d| is_outdated(d)).collect();

    if quiet {
        writeln!(
            out,
            "Total: {}  Outdated: {}  License gaps: {}",
            deps.len(),
            outdated.len().to_string().yellow(),
            gaps.len().to_string().red(),
        )?;
        return Ok(out);
    }

    writeln!(out, "\n {} v{}", "dep-report".bold(), env!("CARGO_PKG_VERSION"))?;
    writeln!(out, " Product: {}", report.product)?;
    writeln!(
        out,
        " Commit:  {} ({})\n",
        report.build_commit, report.build_commit_time
    )?;

    writeln!(out, " ┌────────────────────────────────────────────────────┐")?;
    writeln!(out, " │  {:<48} │", "SUMMARY".bold())?;
    writeln!(out, " │  {:<48} │", format!("Total dependencies : {}", deps.len()))?;
    writeln!(out, " │  {:<48} │", format!("By source          : {}", summarize_providers(deps)))?;
    writeln!(
        out,
        " │  {:<48} │",
        format!("{}  Outdated        : {:>4}", "⚠".yellow(), outdated.len())
    )?;
    writeln!(
        out,
        " │  {:<48} │",
        format!("{}  License gaps    : {:>4}", "✗".red(), gaps.len())
    )?;
    writeln!(out, " └────────────────────────────────────────────────────┘\n")?;

    if !gaps.is_empty() {
        writeln!(out, " {} Dependencies without a license:\n", "[GAP]".red().bold())?;
        writeln!(out, "{}\n", build_table(&gaps))?;
    }

    if !outdated.is_empty() {
        writeln!(out, " {} Dependencies behind upstream:\n", "[OUTDATED]".yellow().bold())?;
        writeln!(out, "{}\n", build_table(&outdated))?;
    }

    if verbose && !deps.is_empty() {
        let all: Vec<&ReportRecord> = deps.iter().collect();
        writeln!(out, " {} All dependencies:\n", "[ALL]".green().bold())?;
        writeln!(out, "{}\n", build_table(&all))?;
    }

    Ok(out)
}

fn is_license_gap(record: &ReportRecord) -> bool {
    record.license.as_deref() == Some(UNKNOWN_LICENSE)
}

fn is_outdated(record: &ReportRecord) -> bool {
    !record.installed.commit.is_empty()
        && !record.latest.commit.is_empty()
        && record.installed.commit != record.latest.commit
}

fn build_table(records: &[&ReportRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Source").add_attribute(Attribute::Bold),
            Cell::new("Installed").add_attribute(Attribute::Bold),
            Cell::new("Latest").add_attribute(Attribute::Bold),
            Cell::new("License").add_attribute(Attribute::Bold),
        ]);

    for record in records {
        let provider_color = match record.provider {
            Provider::Github => Color::Green,
            Provider::Gerrit => Color::Cyan,
            Provider::Gitlab => Color::Magenta,
            Provider::Unknown => Color::DarkGrey,
        };

        let license = record.license.as_deref().unwrap_or("-");
        let license_cell = if license == UNKNOWN_LICENSE {
            Cell::new(license).fg(Color::Red)
        } else {
            Cell::new(license)
        };

        table.add_row(vec![
            Cell::new(&record.name),
            Cell::new(record.provider.to_string()).fg(provider_color),
            Cell::new(describe_version(
                record.installed.version.as_deref(),
                &record.installed.commit,
            )),
            Cell::new(describe_version(record.latest.version.as_deref(), &record.latest.commit)),
            license_cell,
        ]);
    }

    table
}

/// `v1.2.0 (abc1234)`, or whichever half is known.
fn describe_version(version: Option<&str>, commit: &str) -> String {
    let short = &commit[..commit.len().min(SHORT_HASH)];
    match (version, short.is_empty()) {
        (Some(v), false) => format!("{v} ({short})"),
        (Some(v), true) => v.to_string(),
        (None, false) => short.to_string(),
        (None, true) => "-".to_string(),
    }
}

fn summarize_providers(deps: &[ReportRecord]) -> String {
    let mut counts: HashMap<Provider, usize> = HashMap::new();
    for dep in deps {
        *counts.entry(dep.provider).or_insert(0) += 1;
    }

    let mut pairs: Vec<(Provider, usize)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.to_string().cmp(&b.0.to_string())));

    pairs
        .iter()
        .map(|(provider, count)| format!("{provider} {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}
