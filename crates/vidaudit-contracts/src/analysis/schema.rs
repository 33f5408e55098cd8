use serde_json::{json, Value};

pub const REQUIRED_FIELDS: [&str; 5] = [
    "score",
    "statAnalysis",
    "categories",
    "todoList",
    "extractedStats",
];

/// Output schema sent as `generationConfig.responseSchema`.
///
/// The service is asked to honor it; `ResponseValidator` still checks every
/// field on the way back.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "score": { "type": "NUMBER" },
            "extractedStats": {
                "type": "OBJECT",
                "properties": {
                    "ctr": { "type": "STRING" },
                    "retention": { "type": "STRING" },
                    "title": { "type": "STRING" },
                },
            },
            "statAnalysis": { "type": "STRING" },
            "categories": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "icon": { "type": "STRING" },
                        "details": { "type": "ARRAY", "items": { "type": "STRING" } },
                    },
                },
            },
            "todoList": { "type": "ARRAY", "items": { "type": "STRING" } },
        },
        "required": REQUIRED_FIELDS,
    })
}
