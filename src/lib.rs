pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{
    analyze_client::HttpAnalysisService, anthropic::AnthropicClient,
    memory_store::InMemoryVectorStore, pubmed::PubMedClient, storage::LocalStorage,
    supabase::SupabaseVectorStore, voyage::VoyageEmbedder,
};
pub use config::AppConfig;
pub use core::{
    ingest::IngestionRunner, intake::IntakeForm, rag::RagPipeline, session::IntakeSession,
};
pub use utils::error::{PromptError, Result};
