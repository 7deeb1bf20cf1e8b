//! Documentation corpus indexing and citation-safe retrieval.
//!
//! Provides a documentation RAG pipeline: source files are parsed
//! into heading-scoped sections, chunked into size-bounded retrieval
//! units, embedded and stored in a flat inner-product index, then
//! retrieved per query and packed into a budget-bounded,
//! injection-guarded context string with deduplicated citations.

pub mod chunker;
pub mod citations;
pub mod config;
pub mod context;
pub mod error;
pub mod indexer;
pub mod manifest;
pub mod retriever;
pub mod section;
pub mod store;

pub use error::{IndexError, Result};
