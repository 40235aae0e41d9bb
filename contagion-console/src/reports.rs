use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use contagion_engine::{DiseaseCatalog, SpreadVector};
use std::io::Write;

use crate::simulate::SimulationReport;

fn format_stages(stages: &std::collections::BTreeMap<u32, usize>) -> String {
    if stages.is_empty() {
        return "-".to_string();
    }
    stages
        .iter()
        .map(|(stage, count)| format!("s{stage}:{count}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn spread_label(vector: SpreadVector) -> String {
    format!("{vector:?}").to_lowercase()
}

pub fn generate_console_report<W: Write + ?Sized>(
    out: &mut W,
    report: &SimulationReport,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Outbreak Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "===================".cyan())?;
    writeln!(out, "Seed: {}", report.seed)?;
    writeln!(out, "Simulated: {:.1}s over {} ticks", report.duration_secs, report.ticks)?;
    writeln!(out, "Population: {}", report.population)?;
    writeln!(out, "Patient zero: {}", report.patient_zero)?;
    writeln!(out)?;

    if report.diseases.is_empty() {
        writeln!(out, "No infections recorded.")?;
        return Ok(());
    }
    for tally in &report.diseases {
        writeln!(out, "🦠 {} ({})", tally.name.bold(), tally.disease)?;
        writeln!(
            out,
            "   Active: {}  Ever infected: {}  Cured: {}  Blocked: {}",
            tally.active.to_string().red(),
            tally.ever_infected,
            tally.cures.to_string().green(),
            tally.blocked
        )?;
        writeln!(out, "   Stages: {}", format_stages(&tally.stages))?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(
    out: &mut W,
    report: &SimulationReport,
) -> Result<()> {
    let json_output = serde_json::to_string_pretty(report)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    out: &mut W,
    report: &SimulationReport,
) -> Result<()> {
    writeln!(out, "# Outbreak Simulation\n")?;
    writeln!(
        out,
        "_Generated {} | seed {} | {:.1}s | {} ticks | population {} | patient zero {}_\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        report.seed,
        report.duration_secs,
        report.ticks,
        report.population,
        report.patient_zero
    )?;
    if report.diseases.is_empty() {
        writeln!(out, "_No infections recorded._")?;
        return Ok(());
    }
    writeln!(
        out,
        "| Disease | Active | Ever infected | Cured | Blocked | Stages |"
    )?;
    writeln!(
        out,
        "|---------|--------|---------------|-------|---------|--------|"
    )?;
    for tally in &report.diseases {
        writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            tally.name,
            tally.active,
            tally.ever_infected,
            tally.cures,
            tally.blocked,
            format_stages(&tally.stages)
        )?;
    }
    Ok(())
}

/// One line per disease: id, display name, stage count and spread vectors.
pub fn generate_catalog_listing<W: Write + ?Sized>(
    out: &mut W,
    catalog: &DiseaseCatalog,
) -> Result<()> {
    writeln!(out, "Available diseases:")?;
    for disease in &catalog.diseases {
        let vectors = disease
            .spread
            .iter()
            .map(|vector| spread_label(*vector))
            .collect::<Vec<_>>();
        let vectors = if vectors.is_empty() {
            "none".to_string()
        } else {
            vectors.join(", ")
        };
        writeln!(
            out,
            "  {:18} - {} ({} stages; spreads by {vectors})",
            disease.id,
            disease.name,
            disease.max_stage()
        )?;
    }
    Ok(())
}
