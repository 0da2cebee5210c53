
use serde_json::Value;
use tracing::debug;

use crate::{Result, ReviewerError};

/// Normalized test-case record parsed from a Zephyr export
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestCase {
    pub title: String,
    pub steps: String,
    pub expected: String,
    pub test_type: String,
    pub preconditions: String,
    pub labels: String,
}

/// Header aliases accepted for each normalized CSV column, lowercase
const COLUMN_ALIASES: &[(&str, &[&str])] = &[
    ("title", &["title", "summary", "test case name", "name"]),
    ("steps", &["steps", "test steps"]),
    ("expected", &["expected result", "expected", "result"]),
    ("test_type", &["test type", "type"]),
    ("preconditions", &["preconditions", "pre-condition"]),
    ("labels", &["labels", "tags"]),
];

/// Parse a Zephyr export (`.json` or CSV) into normalized test cases.
#[inline]
pub fn parse_zephyr_export(raw: &[u8], filename: &str) -> Result<Vec<TestCase>> {
    let cases = if filename.to_lowercase().ends_with(".json") {
        parse_json(raw)?
    } else {
        parse_csv(raw)?
    };

    debug!("Parsed {} test cases from {}", cases.len(), filename);
    Ok(cases)
}

fn parse_json(raw: &[u8]) -> Result<Vec<TestCase>> {
    let payload: Value = serde_json::from_slice(raw)
        .map_err(|e| ReviewerError::Validation(format!("Failed to parse JSON export: {}", e)))?;

    let cases = match &payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("testCases")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    Ok(cases.iter().map(json_case).collect())
}

fn json_case(case: &Value) -> TestCase {
    let labels = match case.get("labels") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => json_string(Some(other)),
        None => String::new(),
    };

    TestCase {
        title: json_string(case.get("title").or_else(|| case.get("name"))),
        steps: json_string(case.get("steps")),
        expected: json_string(case.get("expectedResult").or_else(|| case.get("expected"))),
        test_type: json_string(case.get("testType")),
        preconditions: json_string(case.get("preconditions")),
        labels,
    }
}

fn json_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn parse_csv(raw: &[u8]) -> Result<Vec<TestCase>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(raw);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReviewerError::Validation(format!("Failed to read CSV headers: {}", e)))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut cases = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| ReviewerError::Validation(format!("Failed to read CSV record: {}", e)))?;

        let lookup = |aliases: &[&str]| -> String {
            for alias in aliases {
                if let Some(position) = headers.iter().position(|h| h == alias) {
                    if let Some(value) = record.get(position) {
                        return value.trim().to_string();
                    }
                }
            }
            String::new()
        };

        let mut case = TestCase::default();
        for (field, aliases) in COLUMN_ALIASES {
            let value = lookup(aliases);
            match *field {
                "title" => case.title = value,
                "steps" => case.steps = value,
                "expected" => case.expected = value,
                "test_type" => case.test_type = value,
                "preconditions" => case.preconditions = value,
                _ => case.labels = value,
            }
        }
        cases.push(case);
    }

    Ok(cases)
}
