use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_DISEASE: &str = "Unknown";
pub const DEFAULT_CONFIDENCE: f64 = 80.0;
pub const NO_TREATMENT: &str = "No treatment suggestions available";

/// Structured view of the detection service's free-text answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDiagnosis {
    pub disease_name: String,
    /// Percentage as reported by the service
    pub confidence: f64,
    pub treatment_steps: Vec<String>,
}

/// `ParsedDiagnosis` with the text fields in the display language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedDiagnosis {
    pub disease_name: String,
    pub confidence: f64,
    pub treatment_steps: Vec<String>,
}

enum LineKind<'a> {
    Disease(&'a str),
    Management,
    Confidence(&'a str),
    Other,
}

static FIELD_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_field_regex() -> &'static Regex {
    FIELD_REGEX.get_or_init(|| Regex::new(r"(?i)^(disease|management|confidence):(.*)$").unwrap())
}

fn classify(line: &str) -> LineKind<'_> {
    let Some(caps) = get_field_regex().captures(line) else {
        return LineKind::Other;
    };
    let rest = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    match caps[1].to_ascii_lowercase().as_str() {
        "disease" => LineKind::Disease(rest),
        "management" => LineKind::Management,
        _ => LineKind::Confidence(rest),
    }
}

fn parse_confidence(value: &str) -> Option<f64> {
    let value = value.trim();
    let number = value.strip_suffix('%').unwrap_or(value).trim();
    number
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Parse raw diagnosis text. Never fails: missing fields take defaults.
///
/// Lines are matched on a case-insensitive `Disease:`, `Management:` or
/// `Confidence:` prefix. Once `Management:` is seen, every later non-blank
/// line that is not itself a `Disease:`/`Confidence:` line is a treatment
/// step, up to the end of the text.
pub fn parse_diagnosis(raw: &str) -> ParsedDiagnosis {
    let mut disease_name: Option<String> = None;
    let mut confidence: Option<f64> = None;
    let mut treatment_steps = Vec::new();
    let mut in_treatment = false;

    for line in raw.lines() {
        let line = line.trim();
        match classify(line) {
            LineKind::Disease(rest) => disease_name = Some(rest.trim().to_string()),
            LineKind::Management => in_treatment = true,
            LineKind::Confidence(rest) => {
                // Unparsable values keep whatever was seen before
                if let Some(value) = parse_confidence(rest) {
                    confidence = Some(value);
                }
            }
            LineKind::Other if in_treatment && !line.is_empty() => treatment_steps.push(line.to_string()),
            LineKind::Other => {}
        }
    }

    if treatment_steps.is_empty() {
        treatment_steps.push(NO_TREATMENT.to_string());
    }

    let diagnosis = ParsedDiagnosis {
        disease_name: disease_name.unwrap_or_else(|| UNKNOWN_DISEASE.to_string()),
        confidence: confidence.unwrap_or(DEFAULT_CONFIDENCE),
        treatment_steps,
    };
    tracing::debug!(
        disease = %diagnosis.disease_name,
        confidence = diagnosis.confidence,
        steps = diagnosis.treatment_steps.len(),
        "[ResultParser] parsed diagnosis"
    );
    diagnosis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_result() {
        let raw = "Crop: Soybean\nDisease: Bean pod mottle virus (BPMV)\nManagement:\n* Use resistant varieties\n* Remove infected plants\nConfidence: 92%";
        let parsed = parse_diagnosis(raw);
        assert_eq!(parsed.disease_name, "Bean pod mottle virus (BPMV)");
        assert_eq!(parsed.confidence, 92.0);
        assert_eq!(
            parsed.treatment_steps,
            vec!["* Use resistant varieties", "* Remove infected plants"]
        );
    }

    #[test]
    fn test_unstructured_input_uses_defaults() {
        let parsed = parse_diagnosis("no useful data");
        assert_eq!(parsed.disease_name, UNKNOWN_DISEASE);
        assert_eq!(parsed.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(parsed.treatment_steps, vec![NO_TREATMENT]);
    }

    #[test]
    fn test_empty_input() {
        let parsed = parse_diagnosis("");
        assert_eq!(parsed.disease_name, UNKNOWN_DISEASE);
        assert_eq!(parsed.treatment_steps, vec![NO_TREATMENT]);
    }

    #[test]
    fn test_prefixes_are_case_insensitive() {
        let parsed = parse_diagnosis("DISEASE:  Leaf Rust \nconfidence: 61.5 %\nMANAGEMENT:\nApply fungicide");
        assert_eq!(parsed.disease_name, "Leaf Rust");
        assert_eq!(parsed.confidence, 61.5);
        assert_eq!(parsed.treatment_steps, vec!["Apply fungicide"]);
    }

    #[test]
    fn test_unparsable_confidence_defaults() {
        assert_eq!(parse_diagnosis("Confidence: high").confidence, DEFAULT_CONFIDENCE);
        assert_eq!(parse_diagnosis("Confidence: NaN%").confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_confidence_is_not_clamped() {
        assert_eq!(parse_diagnosis("Confidence: 140%").confidence, 140.0);
        assert_eq!(parse_diagnosis("Confidence: -5").confidence, -5.0);
    }

    #[test]
    fn test_blank_lines_skipped_in_treatment_block() {
        let raw = "Management:\n\n  Water in the morning  \n\n\nRotate crops\n";
        assert_eq!(
            parse_diagnosis(raw).treatment_steps,
            vec!["Water in the morning", "Rotate crops"]
        );
    }

    #[test]
    fn test_lines_before_management_are_ignored() {
        let raw = "Crop: Tomato\nNotes: early stage\nDisease: Early blight";
        let parsed = parse_diagnosis(raw);
        assert_eq!(parsed.disease_name, "Early blight");
        assert_eq!(parsed.treatment_steps, vec![NO_TREATMENT]);
    }

    // Disease:/Confidence: lines inside the block are read as fields but do
    // not close the block.
    #[test]
    fn test_treatment_block_runs_to_end_of_text() {
        let raw = "Management:\nSpray neem oil\nDisease: Powdery mildew\nRemove debris\nConfidence: 70%\nCrop: Grape";
        let parsed = parse_diagnosis(raw);
        assert_eq!(parsed.disease_name, "Powdery mildew");
        assert_eq!(parsed.confidence, 70.0);
        assert_eq!(
            parsed.treatment_steps,
            vec!["Spray neem oil", "Remove debris", "Crop: Grape"]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let parsed = parse_diagnosis("Disease: Leaf spot\r\nManagement:\r\nPrune\r\nConfidence: 88%\r\n");
        assert_eq!(parsed.disease_name, "Leaf spot");
        assert_eq!(parsed.confidence, 88.0);
        assert_eq!(parsed.treatment_steps, vec!["Prune"]);
    }
}
