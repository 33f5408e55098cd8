use serde_json::{Map, Value};
use vidaudit_contracts::analysis::{
    AnalysisResult, Category, CategoryIcon, ExtractedStats, STAT_PLACEHOLDER, TITLE_PLACEHOLDER,
};
use vidaudit_contracts::errors::AnalysisError;

/// Turns the service's raw reply into a typed result.
///
/// The model is asked for a schema-conforming object but nothing enforces it,
/// so every field is read individually. Missing or falsy collections become
/// empty, missing stats become placeholders, and only truthy values of the
/// wrong container type are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, raw_payload: &str) -> Result<AnalysisResult, AnalysisError> {
        if raw_payload.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }
        let envelope: Value = serde_json::from_str(raw_payload).map_err(|err| {
            AnalysisError::MalformedResponse(format!("envelope is not JSON ({err})"))
        })?;
        let text = extract_answer_text(&envelope).ok_or(AnalysisError::EmptyResponse)?;
        let parsed: Value = serde_json::from_str(text).map_err(|err| {
            AnalysisError::MalformedResponse(format!("answer is not JSON ({err})"))
        })?;
        let Some(answer) = parsed.as_object() else {
            return Err(AnalysisError::MalformedResponse(
                "answer is not a JSON object".to_string(),
            ));
        };

        Ok(AnalysisResult {
            score: parse_score(present(answer, "score")),
            extracted_stats: parse_stats(collection(answer, "extractedStats"))?,
            stat_analysis: present(answer, "statAnalysis")
                .map(value_text)
                .unwrap_or_default(),
            categories: parse_categories(collection(answer, "categories"))?,
            todo_list: parse_text_list("todoList", collection(answer, "todoList"))?,
        })
    }
}

/// `candidates[0].content.parts[0].text`, trimmed; `None` when missing or blank.
pub fn extract_answer_text(envelope: &Value) -> Option<&str> {
    envelope
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

fn present<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|value| !value.is_null())
}

/// `false`, `0` and `""` count as absent, like `null`.
fn collection<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    present(object, key).filter(|value| !is_falsy(value))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn parse_score(value: Option<&Value>) -> u8 {
    let raw = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.filter(|score| score.is_finite())
        .map(|score| score.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0)
}

fn parse_stats(value: Option<&Value>) -> Result<ExtractedStats, AnalysisError> {
    let Some(value) = value else {
        return Ok(ExtractedStats::default());
    };
    let Some(stats) = value.as_object() else {
        return Err(AnalysisError::MalformedResponse(
            "extractedStats must be an object".to_string(),
        ));
    };
    let field = |key: &str, placeholder: &str| {
        present(stats, key)
            .map(value_text)
            .unwrap_or_else(|| placeholder.to_string())
    };
    Ok(ExtractedStats {
        ctr: field("ctr", STAT_PLACEHOLDER),
        retention: field("retention", STAT_PLACEHOLDER),
        title: field("title", TITLE_PLACEHOLDER),
    })
}

fn parse_categories(value: Option<&Value>) -> Result<Vec<Category>, AnalysisError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let Some(entries) = value.as_array() else {
        return Err(AnalysisError::MalformedResponse(
            "categories must be an array".to_string(),
        ));
    };

    let mut categories = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        let Some(entry) = entry.as_object() else {
            continue;
        };
        categories.push(Category {
            name: present(entry, "name").map(value_text).unwrap_or_default(),
            icon: present(entry, "icon")
                .and_then(Value::as_str)
                .map(CategoryIcon::from_label)
                .unwrap_or_default(),
            details: parse_text_list(
                &format!("categories[{idx}].details"),
                collection(entry, "details"),
            )?,
        });
    }
    Ok(categories)
}

fn parse_text_list(field: &str, value: Option<&Value>) -> Result<Vec<String>, AnalysisError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let Some(items) = value.as_array() else {
        return Err(AnalysisError::MalformedResponse(format!(
            "{field} must be an array"
        )));
    };
    Ok(items.iter().map(value_text).collect())
}
