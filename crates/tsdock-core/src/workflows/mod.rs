//! # Workflows Module
//!
//! Top-level entry points of the library.
//!
//! - **Embedding Workflow** ([`embed`]) - Pairing enumeration, alignment,
//!   rotational scanning and pruning, ending in a deduplicated pose population.
//! - **Refinement Workflow** ([`refine`]) - Hands a population to an external
//!   optimizer, prunes the refined structures and optionally seeds
//!   transition-state searches.
//!
//! Both workflows raise [`crate::engine::error::EngineError::SearchExhausted`]
//! when nothing survives, unless the safety override is engaged.

pub mod embed;
pub mod refine;
