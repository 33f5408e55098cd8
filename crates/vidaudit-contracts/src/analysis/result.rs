use serde::{Deserialize, Serialize};

pub const STAT_PLACEHOLDER: &str = "N/A";
pub const TITLE_PLACEHOLDER: &str = "Inconnu";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryIcon {
    Hook,
    Seo,
    Engagement,
    #[default]
    Other,
}

impl CategoryIcon {
    /// Unknown labels map to `Other` rather than failing; the model is not
    /// trusted to stay inside the declared vocabulary.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "hook" => Self::Hook,
            "seo" => Self::Seo,
            "engagement" => Self::Engagement,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hook => "hook",
            Self::Seo => "seo",
            Self::Engagement => "engagement",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedStats {
    pub ctr: String,
    pub retention: String,
    pub title: String,
}

impl Default for ExtractedStats {
    fn default() -> Self {
        Self {
            ctr: STAT_PLACEHOLDER.to_string(),
            retention: STAT_PLACEHOLDER.to_string(),
            title: TITLE_PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub icon: CategoryIcon,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Always within `0..=100`.
    pub score: u8,
    pub extracted_stats: ExtractedStats,
    pub stat_analysis: String,
    pub categories: Vec<Category>,
    pub todo_list: Vec<String>,
}
