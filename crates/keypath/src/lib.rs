//! Key paths for addressing fields inside JSON documents and field schemas.
//!
//! A [`KeyPath`] is a sequence of names and array indices, where an index may
//! be the wildcard meaning "every element". The [`topology`] module decides
//! which paths can vary together across array iterations and translates
//! concrete locations between them; [`document`] reads and writes
//! `serde_json::Value` documents through paths.

pub mod document;
pub mod error;
pub mod keypath;
pub mod topology;

pub use document::{get, get_mut, remove, remove_all, search, set, value_kind, Match};
pub use error::{PathError, Result};
pub use keypath::{KeyPath, Segment};
pub use topology::{
    are_local, create_local_matcher, divergent_wildcards, hash_match_to_locale, matches_search,
    BasePathMatcher, Correlation, LocalMatcher, OneToOneMatcher,
};
