// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod ai_adapter;
pub mod api;
pub mod config;
pub mod delivery;
pub mod enrich;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod relevance;
pub mod scheduler;
pub mod sentiment;
pub mod speech;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::ai_adapter::{DynGenerationClient, GenerateError, GenerationClient};
pub use crate::api::{create_router, AppState};
pub use crate::config::{CourierConfig, InterestsHandle};
pub use crate::delivery::{Courier, RunReport};
pub use crate::ingest::types::{HeadlineCandidate, HeadlineSource};
pub use crate::notify::Transport;
pub use crate::relevance::{FilterConfig, RelevanceFilter};
pub use crate::sentiment::Sentiment;
pub use crate::store::{DeliveryRecord, RecordStore};
