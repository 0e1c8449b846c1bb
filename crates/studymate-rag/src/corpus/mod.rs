//! Corpus lifecycle: ingest, publish, ask

mod manager;
mod state;

pub use manager::{CorpusManager, CorpusStats};
pub use state::CorpusState;
