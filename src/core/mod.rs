pub mod evidence;
pub mod ingest;
pub mod intake;
pub mod prompt;
pub mod rag;
pub mod render;
pub mod session;

pub use crate::domain::model::{AnalysisResult, AnalyzeRequest, ResearchArticle};
pub use crate::domain::ports::{AnalysisService, Pipeline, Storage};
pub use crate::utils::error::Result;
