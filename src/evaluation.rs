//! Per-model evaluation averages.
//!
//! Reads the `评测结果_*.json` documents produced by the evaluation run and
//! flattens each into one [`EvaluationRow`]. The documents are loosely
//! shaped, so fields are read through [`DocView`] and coerced with
//! [`coerce_number`] instead of being deserialized into a fixed schema.

use crate::error::{CorpusError, Result};
use crate::text::compare_names;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// File name prefix of evaluation documents.
pub const EVAL_FILE_PREFIX: &str = "评测结果_";

/// Outline-evaluation documents carry this infix and are not chapter scores.
pub const EXCLUDED_INFIX: &str = "_dagang_";

/// Superseded result set kept on disk for reference only.
pub const EXCLUDED_FILE: &str = "评测结果_qwen3-max.json";

const MODEL_NAME: &str = "model_name";
const TOTAL_CHAPTERS: &str = "total_chapters";
const STATISTICS: &str = "statistics";
const OVERALL: &str = "总体统计";
const DIMENSIONS: &str = "维度分析";
const EVALUATED_CHAPTERS: &str = "评测章节数";
const WEIGHTED_AVERAGE: &str = "加权平均分";
const AVERAGE: &str = "平均分";

/// One of the four fixed evaluation axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    #[serde(rename = "文风契合度")]
    StyleFit,
    #[serde(rename = "人物一致性")]
    CharacterConsistency,
    #[serde(rename = "语言质量")]
    LanguageQuality,
    #[serde(rename = "文学性")]
    LiteraryQuality,
}

impl Dimension {
    /// All dimensions in report order.
    pub const ALL: [Dimension; 4] = [
        Dimension::StyleFit,
        Dimension::CharacterConsistency,
        Dimension::LanguageQuality,
        Dimension::LiteraryQuality,
    ];

    /// Label used as the key in evaluation documents.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::StyleFit => "文风契合度",
            Dimension::CharacterConsistency => "人物一致性",
            Dimension::LanguageQuality => "语言质量",
            Dimension::LiteraryQuality => "文学性",
        }
    }
}

/// Average score per dimension. Always carries all four.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    #[serde(rename = "文风契合度")]
    pub style_fit: f64,
    #[serde(rename = "人物一致性")]
    pub character_consistency: f64,
    #[serde(rename = "语言质量")]
    pub language_quality: f64,
    #[serde(rename = "文学性")]
    pub literary_quality: f64,
}

impl DimensionScores {
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::StyleFit => self.style_fit,
            Dimension::CharacterConsistency => self.character_consistency,
            Dimension::LanguageQuality => self.language_quality,
            Dimension::LiteraryQuality => self.literary_quality,
        }
    }

    pub fn set(&mut self, dimension: Dimension, score: f64) {
        let slot = match dimension {
            Dimension::StyleFit => &mut self.style_fit,
            Dimension::CharacterConsistency => &mut self.character_consistency,
            Dimension::LanguageQuality => &mut self.language_quality,
            Dimension::LiteraryQuality => &mut self.literary_quality,
        };
        *slot = score;
    }
}

/// Averaged scores for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRow {
    pub model: String,
    pub chapter_count: f64,
    pub average_score: f64,
    pub dimension_scores: DimensionScores,
}

/// Read-only view of an optional field in a parsed document.
#[derive(Debug, Clone, Copy)]
pub struct DocView<'a>(Option<&'a Value>);

impl<'a> DocView<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self(Some(value))
    }

    /// Child field; missing when absent or when this is not an object.
    pub fn get(self, key: &str) -> DocView<'a> {
        DocView(self.0.and_then(|v| v.as_object()).and_then(|o| o.get(key)))
    }

    /// Present and not `null`.
    pub fn is_present(self) -> bool {
        matches!(self.0, Some(v) if !v.is_null())
    }

    /// This field, or `fallback` when absent or `null`.
    pub fn or(self, fallback: DocView<'a>) -> DocView<'a> {
        if self.is_present() { self } else { fallback }
    }

    /// Best-effort number, see [`coerce_number`].
    pub fn as_number(self) -> f64 {
        coerce_number(self.0)
    }

    /// Best-effort text: strings as-is, non-zero numbers and `true` printed,
    /// everything else empty.
    pub fn as_text(self) -> String {
        match self.0 {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
            Some(Value::Bool(true)) => "true".to_string(),
            _ => String::new(),
        }
    }
}

/// Coerce a loosely typed field to a finite number, defaulting to 0.
pub fn coerce_number(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                parse_numeric_literal(s)
            }
        }
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Array(items)) => match items.as_slice() {
            [] => 0.0,
            [single] => coerce_number(Some(single)),
            _ => f64::NAN,
        },
        Some(Value::Null) => 0.0,
        Some(Value::Object(_)) | None => f64::NAN,
    };

    if n.is_finite() { n } else { 0.0 }
}

/// Decimal or `0x`/`0o`/`0b` prefixed literal; `NaN` when malformed.
fn parse_numeric_literal(s: &str) -> f64 {
    let radix = match s.get(..2) {
        Some("0x" | "0X") => 16,
        Some("0o" | "0O") => 8,
        Some("0b" | "0B") => 2,
        _ => return s.parse().unwrap_or(f64::NAN),
    };

    let digits = &s[2..];
    if digits.is_empty() {
        return f64::NAN;
    }

    digits
        .chars()
        .try_fold(0.0, |acc, c| {
            c.to_digit(radix)
                .map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN)
}

/// Whether a file name denotes a chapter-evaluation document to aggregate.
pub fn is_evaluation_file(name: &str) -> bool {
    name.starts_with(EVAL_FILE_PREFIX)
        && name.ends_with(".json")
        && !name.contains(EXCLUDED_INFIX)
        && name != EXCLUDED_FILE
}

/// Flatten one parsed document. `None` when it names no model.
pub fn row_from_document(doc: &Value) -> Option<EvaluationRow> {
    let doc = DocView::new(doc);

    let model = doc.get(MODEL_NAME).as_text().trim().to_string();
    if model.is_empty() {
        return None;
    }

    let stats = doc.get(STATISTICS);
    let overall = stats.get(OVERALL);
    let dims = stats.get(DIMENSIONS);

    let mut dimension_scores = DimensionScores::default();
    for dimension in Dimension::ALL {
        dimension_scores.set(dimension, dims.get(dimension.label()).get(AVERAGE).as_number());
    }

    Some(EvaluationRow {
        model,
        chapter_count: overall
            .get(EVALUATED_CHAPTERS)
            .or(doc.get(TOTAL_CHAPTERS))
            .as_number(),
        average_score: overall.get(WEIGHTED_AVERAGE).as_number(),
        dimension_scores,
    })
}

fn read_document(path: &Path) -> Result<Value> {
    let bytes = fs::read(path).map_err(|e| CorpusError::io(path, e))?;
    let raw = String::from_utf8_lossy(&bytes);
    let raw = raw.strip_prefix('\u{FEFF}').unwrap_or(&raw);
    serde_json::from_str(raw).map_err(|e| CorpusError::json(path, e))
}

/// Aggregate every evaluation document in `dir`, failing on the first
/// unreadable or malformed file.
pub fn try_evaluation_averages(dir: &Path) -> Result<Vec<EvaluationRow>> {
    let mut rows = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if !is_evaluation_file(&name) {
            continue;
        }

        let doc = read_document(entry.path())?;
        match row_from_document(&doc) {
            Some(row) => rows.push(row),
            None => tracing::debug!(file = %name, "Evaluation document has no model name"),
        }
    }

    rows.sort_by(|a, b| {
        b.average_score
            .partial_cmp(&a.average_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| compare_names(&a.model, &b.model))
    });

    Ok(rows)
}

/// Aggregate evaluation documents; any failure yields an empty list.
pub fn evaluation_averages(dir: &Path) -> Vec<EvaluationRow> {
    try_evaluation_averages(dir).unwrap_or_else(|e| {
        tracing::debug!(dir = %dir.display(), error = %e, "Evaluation aggregation failed");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn full_doc(model: &str, avg: f64) -> Value {
        json!({
            "model_name": model,
            "total_chapters": 40,
            "statistics": {
                "总体统计": { "评测章节数": 20, "加权平均分": avg },
                "维度分析": {
                    "文风契合度": { "平均分": 8.1 },
                    "人物一致性": { "平均分": "7.5" },
                    "语言质量": { "平均分": 9 },
                    "文学性": { "平均分": 6.25 }
                }
            }
        })
    }

    fn write_doc(dir: &Path, name: &str, doc: &Value) {
        fs::write(dir.join(name), serde_json::to_string(doc).unwrap()).unwrap();
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(Some(&json!(3.5))), 3.5);
        assert_eq!(coerce_number(Some(&json!(" 7.25 "))), 7.25);
        assert_eq!(coerce_number(Some(&json!(""))), 0.0);
        assert_eq!(coerce_number(Some(&json!("abc"))), 0.0);
        assert_eq!(coerce_number(Some(&json!("Infinity"))), 0.0);
        assert_eq!(coerce_number(Some(&json!(true))), 1.0);
        assert_eq!(coerce_number(Some(&json!(null))), 0.0);
        assert_eq!(coerce_number(Some(&json!(["4"]))), 4.0);
        assert_eq!(coerce_number(Some(&json!({"a": 1}))), 0.0);
        assert_eq!(coerce_number(None), 0.0);
    }

    #[test]
    fn test_coerce_prefixed_literals() {
        assert_eq!(coerce_number(Some(&json!("0x10"))), 16.0);
        assert_eq!(coerce_number(Some(&json!(" 0XfF "))), 255.0);
        assert_eq!(coerce_number(Some(&json!("0o17"))), 15.0);
        assert_eq!(coerce_number(Some(&json!("0b101"))), 5.0);
        assert_eq!(coerce_number(Some(&json!("0xZZ"))), 0.0);
        assert_eq!(coerce_number(Some(&json!("0x"))), 0.0);
        assert_eq!(coerce_number(Some(&json!("0b102"))), 0.0);
        assert_eq!(coerce_number(Some(&json!("-0x10"))), 0.0);
        assert_eq!(coerce_number(Some(&json!("0.5"))), 0.5);
    }

    #[test]
    fn test_is_evaluation_file() {
        assert!(is_evaluation_file("评测结果_gpt-5.json"));
        assert!(!is_evaluation_file("评测结果_gpt-5_dagang_v1.json"));
        assert!(!is_evaluation_file("评测结果_qwen3-max.json"));
        assert!(is_evaluation_file("评测结果_qwen3-max-preview.json"));
        assert!(!is_evaluation_file("结果_gpt-5.json"));
        assert!(!is_evaluation_file("评测结果_gpt-5.txt"));
    }

    #[test]
    fn test_row_from_full_document() {
        let row = row_from_document(&full_doc("  gpt-5 ", 8.4)).unwrap();
        assert_eq!(row.model, "gpt-5");
        assert_eq!(row.chapter_count, 20.0);
        assert_eq!(row.average_score, 8.4);
        assert_eq!(row.dimension_scores.get(Dimension::StyleFit), 8.1);
        assert_eq!(row.dimension_scores.get(Dimension::CharacterConsistency), 7.5);
        assert_eq!(row.dimension_scores.get(Dimension::LanguageQuality), 9.0);
        assert_eq!(row.dimension_scores.get(Dimension::LiteraryQuality), 6.25);
    }

    #[test]
    fn test_row_without_dimensions_defaults_to_zero() {
        let doc = json!({
            "model_name": "claude",
            "total_chapters": 12,
            "statistics": { "总体统计": { "加权平均分": 7 } }
        });

        let row = row_from_document(&doc).unwrap();
        assert_eq!(row.chapter_count, 12.0);
        assert_eq!(row.dimension_scores, DimensionScores::default());
    }

    #[test]
    fn test_null_chapter_count_falls_back() {
        let doc = json!({
            "model_name": "m",
            "total_chapters": 5,
            "statistics": { "总体统计": { "评测章节数": null } }
        });
        assert_eq!(row_from_document(&doc).unwrap().chapter_count, 5.0);
    }

    #[test]
    fn test_row_skipped_without_model() {
        assert!(row_from_document(&json!({ "model_name": "   " })).is_none());
        assert!(row_from_document(&json!({ "statistics": {} })).is_none());
        assert!(row_from_document(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_dimension_scores_serialize_with_labels() {
        let value = serde_json::to_value(DimensionScores::default()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.len(), 4);
        for dimension in Dimension::ALL {
            assert!(keys.contains(&dimension.label()));
        }
    }

    #[test]
    fn test_aggregate_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "评测结果_b.json", &full_doc("beta", 8.0));
        write_doc(dir.path(), "评测结果_a.json", &full_doc("alpha", 8.0));
        write_doc(dir.path(), "评测结果_c.json", &full_doc("gamma", 9.5));
        write_doc(dir.path(), "评测结果_qwen3-max.json", &full_doc("qwen", 10.0));
        write_doc(dir.path(), "评测结果_x_dagang_1.json", &full_doc("outline", 10.0));
        write_doc(dir.path(), "notes.json", &full_doc("other", 10.0));
        fs::write(
            dir.path().join("评测结果_bom.json"),
            format!("\u{FEFF}{}", json!({ "model_name": "bom" })),
        )
        .unwrap();

        let rows = evaluation_averages(dir.path());
        let models: Vec<&str> = rows.iter().map(|r| r.model.as_str()).collect();
        assert_eq!(models, vec!["gamma", "alpha", "beta", "bom"]);
    }

    #[test]
    fn test_equal_scores_ordered_ignoring_case() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "评测结果_g.json", &full_doc("gpt-5", 8.0));
        write_doc(dir.path(), "评测结果_c.json", &full_doc("Claude", 8.0));
        write_doc(dir.path(), "评测结果_a.json", &full_doc("alpha", 8.0));

        let models: Vec<String> = evaluation_averages(dir.path())
            .into_iter()
            .map(|r| r.model)
            .collect();
        assert_eq!(models, vec!["alpha", "Claude", "gpt-5"]);
    }

    #[test]
    fn test_malformed_file_empties_result() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "评测结果_a.json", &full_doc("alpha", 8.0));
        fs::write(dir.path().join("评测结果_broken.json"), "{ not json").unwrap();

        assert!(evaluation_averages(dir.path()).is_empty());
        assert!(try_evaluation_averages(dir.path()).is_err());
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(evaluation_averages(&dir.path().join("eval")).is_empty());
    }

    #[test]
    fn test_recomputed_every_call() {
        let dir = TempDir::new().unwrap();
        assert!(evaluation_averages(dir.path()).is_empty());

        write_doc(dir.path(), "评测结果_a.json", &full_doc("alpha", 8.0));
        assert_eq!(evaluation_averages(dir.path()).len(), 1);
    }
}
