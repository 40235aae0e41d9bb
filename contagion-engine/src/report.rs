//! Plain-text diagnostic reports built from a carrier sample.
use serde::{Deserialize, Serialize};

use crate::catalog::{CureStep, DiseaseCatalog, DiseaseDef, SpreadVector, StealthFlag};

const UNKNOWN_PATHOGEN: &str = "unknown pathogen";

/// One disease found in a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleEntry {
    pub disease: String,
    pub stage: u32,
}

impl SampleEntry {
    #[must_use]
    pub fn new(disease: impl Into<String>, stage: u32) -> Self {
        Self {
            disease: disease.into(),
            stage,
        }
    }
}

/// Swab taken from a carrier, optionally tagged with who it came from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SampleRecord {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub diseases: Vec<SampleEntry>,
}

/// Which instrument is reading the sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Handheld scan: names and stages only.
    Analyzer,
    /// Full workup including spread and treatment.
    Diagnoser,
}

impl ReportKind {
    const fn hiding_flag(self) -> StealthFlag {
        match self {
            Self::Analyzer => StealthFlag::HiddenAnalyzer,
            Self::Diagnoser => StealthFlag::HiddenDiagnoser,
        }
    }

    const fn title(self) -> &'static str {
        match self {
            Self::Analyzer => "Health analyzer scan",
            Self::Diagnoser => "Disease diagnoser report",
        }
    }
}

#[must_use]
pub fn render_report(catalog: &DiseaseCatalog, sample: &SampleRecord, kind: ReportKind) -> String {
    let mut lines = vec![
        kind.title().to_string(),
        format!(
            "Subject: {}",
            sample.subject.as_deref().unwrap_or("unidentified")
        ),
    ];

    let mut listed = 0;
    for entry in &sample.diseases {
        let Some(def) = catalog.disease(&entry.disease) else {
            lines.push(format!("- {UNKNOWN_PATHOGEN} ({})", entry.disease));
            listed += 1;
            continue;
        };
        let stage = def.stage(entry.stage);
        if stage.is_some_and(|s| s.is_hidden(kind.hiding_flag())) {
            continue;
        }
        listed += 1;
        lines.push(format!(
            "- {} ({}), stage {} of {}",
            def.name,
            def.id,
            entry.stage,
            def.max_stage()
        ));
        if kind == ReportKind::Diagnoser {
            let hide_treatment =
                stage.is_some_and(|s| s.is_hidden(StealthFlag::HiddenTreatment));
            diagnoser_details(&mut lines, def, entry.stage, hide_treatment);
        }
    }
    if listed == 0 {
        lines.push("No pathogens detected.".to_string());
    }
    lines.join("\n")
}

fn diagnoser_details(lines: &mut Vec<String>, def: &DiseaseDef, stage: u32, hide_treatment: bool) {
    if def.beneficial {
        lines.push("  Beneficial: yes".to_string());
    }
    let vectors: Vec<&str> = def.spread.iter().map(|v| vector_label(*v)).collect();
    if vectors.is_empty() {
        lines.push("  Spread: none".to_string());
    } else {
        lines.push(format!("  Spread: {}", vectors.join(", ")));
    }
    if hide_treatment {
        return;
    }
    let cures = def.cures_for_stage(stage);
    if cures.is_empty() {
        lines.push("  Treatment: none known".to_string());
    } else {
        lines.push("  Treatment:".to_string());
        lines.extend(cures.iter().map(describe_step));
    }
    if def.post_cure_immunity > 0.0 {
        lines.push(format!(
            "  Post-cure immunity: {:.0}%",
            def.post_cure_immunity * 100.0
        ));
    }
}

fn describe_step(step: &CureStep) -> String {
    let effect = if step.lower_stage { " (eases stage)" } else { "" };
    if step.chance >= 1.0 {
        format!("    * {}{effect}", step.condition.describe())
    } else {
        format!(
            "    * {}{effect}, {:.0}% chance",
            step.condition.describe(),
            step.chance * 100.0
        )
    }
}

const fn vector_label(vector: SpreadVector) -> &'static str {
    match vector {
        SpreadVector::Contact => "contact",
        SpreadVector::Airborne => "airborne",
        SpreadVector::Blood => "blood",
        SpreadVector::Special => "special",
    }
}
