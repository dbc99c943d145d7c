//! Listing-site fetching and descriptor-driven extraction.
//!
//! This crate provides:
//! - [`adapters`]: The [`ListingParser`] trait with HTML and JSON parsers
//! - [`ParserRegistry`]: Picks the parser for a source's body format
//! - [`engine`]: The generic [`SourceAdapter`] that fetches and parses one source

pub mod adapters;
pub mod engine;

pub use adapters::{ExtractedFields, HtmlListParser, JsonListParser, ListingParser, ParserRegistry};
pub use engine::{SourceAdapter, SourceFetch};
