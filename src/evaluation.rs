//! Offline comparison of reference income categories against the model's.
//!
//! Input is a CSV export with one row per transaction carrying both the
//! reference label and the model's label, plus a `match` column.

use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;

use crate::error::Result;
use crate::presentation::FieldMap;

/// Category id meaning "no income category assigned".
pub const UNCATEGORIZED_INCOME_ID: &str = "184287dd-bed3-48c6-820a-8b4fe57a131c";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizationRecord {
    #[serde(default)]
    pub transaction_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub income_category: Option<String>,
    pub income_category_id: String,
    pub llm_income_category_id: String,
    #[serde(default)]
    pub llm_income_category_name: Option<String>,
    #[serde(rename = "match", deserialize_with = "deserialize_flag")]
    pub is_match: bool,
}

impl CategorizationRecord {
    pub fn fields() -> FieldMap {
        FieldMap::new()
            .value("transaction_date", "Date")
            .text("description", "Description")
            .value("amount", "Amount")
            .value("income_category", "Reference Income Category")
            .value("llm_income_category_name", "LLM Income Category")
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid match flag '{}'",
            other
        ))),
    }
}

pub fn load_categorization_records<R: Read>(reader: R) -> Result<Vec<CategorizationRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in csv_reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizationSummary {
    pub total: usize,
    pub reference_categorized: usize,
    pub reference_categorized_pct: Option<f64>,
    pub llm_categorized: usize,
    pub llm_categorized_pct: Option<f64>,
    /// Relative change of the model's categorized share over the reference's.
    pub categorized_delta_pct: Option<f64>,
    pub matches: usize,
    pub mismatches: usize,
    pub match_rate_pct: Option<f64>,
    /// Reference-categorized rows the model disagreed with.
    pub mismatched: Vec<CategorizationRecord>,
    /// Rows the reference left uncategorized but the model labelled.
    pub newly_categorized: Vec<CategorizationRecord>,
}

fn percentage(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| 100.0 * part as f64 / whole as f64)
}

impl CategorizationSummary {
    pub fn from_records(records: &[CategorizationRecord], uncategorized_id: &str) -> Self {
        let total = records.len();

        let (reference, unreferenced): (Vec<&CategorizationRecord>, Vec<&CategorizationRecord>) =
            records
                .iter()
                .partition(|r| r.income_category_id != uncategorized_id);
        let llm_categorized = records
            .iter()
            .filter(|r| r.llm_income_category_id != uncategorized_id)
            .count();

        let matches = reference.iter().filter(|r| r.is_match).count();
        let mismatched: Vec<CategorizationRecord> = reference
            .iter()
            .filter(|r| !r.is_match)
            .map(|r| (*r).clone())
            .collect();
        let newly_categorized = unreferenced
            .iter()
            .filter(|r| r.llm_income_category_id != uncategorized_id)
            .map(|r| (*r).clone())
            .collect();

        let reference_categorized_pct = percentage(reference.len(), total);
        let llm_categorized_pct = percentage(llm_categorized, total);
        let categorized_delta_pct = match (reference_categorized_pct, llm_categorized_pct) {
            (Some(reference), Some(llm)) if reference > 0.0 => Some(100.0 * (llm / reference - 1.0)),
            _ => None,
        };

        Self {
            total,
            reference_categorized: reference.len(),
            reference_categorized_pct,
            llm_categorized,
            llm_categorized_pct,
            categorized_delta_pct,
            matches,
            mismatches: reference.len() - matches,
            match_rate_pct: percentage(matches, reference.len()),
            mismatched,
            newly_categorized,
        }
    }
}
