use serde_json::{json, Value};

use crate::attachment::Attachment;

use super::schema::response_schema;

pub const NO_LINK_PLACEHOLDER: &str = "No link provided";

/// One analysis attempt. Holds its own copy of the attachments, so edits to
/// the attachment store after submission never reach an in-flight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    video_reference: Option<String>,
    attachments: Vec<Attachment>,
    instruction_text: String,
}

impl AnalysisRequest {
    pub fn new(
        video_reference: Option<String>,
        attachments: Vec<Attachment>,
        instruction_text: impl Into<String>,
    ) -> Self {
        Self {
            video_reference,
            attachments,
            instruction_text: instruction_text.into(),
        }
    }

    pub fn video_reference(&self) -> Option<&str> {
        self.video_reference.as_deref()
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn instruction_text(&self) -> &str {
        &self.instruction_text
    }

    pub fn user_text(&self) -> String {
        format!(
            "Analyze my video: {}. Extract the stats from the attached images.",
            self.video_reference().unwrap_or(NO_LINK_PLACEHOLDER)
        )
    }

    /// The `generateContent` body: user text first, then one inline part per
    /// attachment in insertion order.
    pub fn payload(&self) -> Value {
        let mut parts = vec![json!({ "text": self.user_text() })];
        for attachment in &self.attachments {
            parts.push(json!({
                "inlineData": {
                    "mimeType": attachment.mime_type,
                    "data": attachment.encoded,
                }
            }));
        }
        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "systemInstruction": { "parts": [{ "text": self.instruction_text }] },
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            },
        })
    }
}
