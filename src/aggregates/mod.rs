//! Per-owner aggregate views and their invalidation.
//!
//! Garden summaries, suggested questions and chat context are derived from
//! all of an owner's plants and cached per owner. Any mutation of a plant or
//! observation evicts the owner's whole entry before the mutating call
//! returns; cached aggregates are never patched field by field.

mod cache;
mod invalidator;
mod summary;

pub use cache::*;
pub use invalidator::*;
pub use summary::*;
