use vidaudit_contracts::analysis::AnalysisRequest;
use vidaudit_contracts::attachment::Attachment;
use vidaudit_contracts::errors::AnalysisError;

pub const MISSING_INPUT_MESSAGE: &str = "Provide at least a YouTube link or a screenshot.";

pub const ANALYST_DIRECTIVE: &str = "You are a YouTube algorithm expert specialized in football channels.
YOUR TASKS:
1. If a URL is provided, analyze its title and topic.
2. If images are provided, visually extract the stats (CTR %, retention %, engagement) and the video title.
3. Produce an honest cross-analysis of the link and the stats.

STRICT RULE: reply EXCLUSIVELY with pure JSON, no other text.
Structure:
- score: number 0-100
- extractedStats: { ctr: string, retention: string, title: string }
- statAnalysis: concise analysis
- categories: array of 3 objects {name: string, icon: \"hook\"|\"seo\"|\"engagement\", details: array of recommendations}
- todoList: array of 6 actions.";

#[derive(Debug, Clone)]
pub struct RequestBuilder {
    instruction_text: String,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            instruction_text: ANALYST_DIRECTIVE.to_string(),
        }
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Needs a non-blank reference or at least one attachment.
    pub fn build(
        &self,
        video_reference: Option<&str>,
        attachments: &[Attachment],
    ) -> Result<AnalysisRequest, AnalysisError> {
        let video_reference = video_reference
            .map(str::trim)
            .filter(|reference| !reference.is_empty())
            .map(str::to_string);
        if video_reference.is_none() && attachments.is_empty() {
            return Err(AnalysisError::Validation(MISSING_INPUT_MESSAGE.to_string()));
        }
        Ok(AnalysisRequest::new(
            video_reference,
            attachments.to_vec(),
            self.instruction_text.clone(),
        ))
    }
}
