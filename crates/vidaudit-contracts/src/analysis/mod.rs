mod request;
mod result;
mod schema;

pub use request::{AnalysisRequest, NO_LINK_PLACEHOLDER};
pub use result::{
    AnalysisResult, Category, CategoryIcon, ExtractedStats, STAT_PLACEHOLDER, TITLE_PLACEHOLDER,
};
pub use schema::{response_schema, REQUIRED_FIELDS};
