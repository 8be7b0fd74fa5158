//! Content suggestions for a newsletter and bookmark reader.
//!
//! Builds an interest centroid from a user's stored embeddings, asks a
//! vector-indexed store for nearby content, and filters out anything the
//! user has already bookmarked or read.

pub mod backend;
pub mod config;
pub mod content;
pub mod factory;
pub mod suggest;
pub mod web;

#[cfg(test)]
mod tests;

pub use content::{ContentCandidate, ContentStatus, ExclusionSet, UserId};
pub use suggest::{SuggestionError, SuggestionService, SuggestionSource, Suggestions};
