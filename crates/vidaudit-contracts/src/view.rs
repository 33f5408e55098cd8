use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewState {
    #[default]
    Input,
    Analyzing,
    Results { export_mode: bool },
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Analyzing => "analyzing",
            Self::Results { export_mode: false } => "results",
            Self::Results { export_mode: true } => "export",
        }
    }

    pub fn is_results(&self) -> bool {
        matches!(self, Self::Results { .. })
    }
}
