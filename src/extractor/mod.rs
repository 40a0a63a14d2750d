//! # Extractor Module
//!
//! Pipeline di estrazione, separata in sottomoduli:
//! - `asset_extractor`: Orchestratore principale (driver del run)
//! - `context`: Stato condiviso di un run
//! - `dispatcher`: Dedup e instradamento dei record ai handler
//! - `scheduler`: Pool di worker e wait-group dinamico
//! - `progress_tracker`: Gestione progress unificata
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod asset_extractor;
pub mod context;
pub mod dispatcher;
pub mod scheduler;
pub mod progress_tracker;
pub mod path_resolver;

pub use asset_extractor::AssetExtractor;
pub use context::ExtractionContext;
pub use dispatcher::{DispatchOutcome, Dispatcher, HandlerKind};
pub use scheduler::{WaitGroup, WorkerPool};
pub use progress_tracker::ProgressTracker;
pub use path_resolver::PathResolver;
