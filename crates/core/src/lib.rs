//! Core library for jira-prompts
//!
//! This crate is the **Functional Core** of the jira-prompts application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`jira_prompts_core`** (this crate): markup conversion and pure
//!   transformations with no network or file I/O
//! - **`jira-prompts`**: Jira HTTP client, CLI and MCP server (the Imperative Shell)
//!
//! The only side effect reachable from here is the [`users::UserLookup`]
//! collaborator behind the user cache, which the shell implements against the
//! Jira user endpoint. Tests plug in closures instead.
//!
//! # Module Organization
//!
//! - [`markup`]: Jira wiki markup <-> Markdown stage pipelines
//! - [`mentions`]: `[~accountid:...]` mentions and `[text|url|smart-link]` tokens
//! - [`html`]: user mentions inside storage-format HTML
//! - [`users`]: bounded LRU cache in front of the user lookup
//! - [`engine`]: the [`Engine`] tying the above together
//! - [`atlassian`]: Jira API models and the brief/full issue views
//!
//! # Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use jira_prompts_core::{Engine, users::NoLookup};
//!
//! let engine = Engine::new(Arc::new(NoLookup), "https://example.atlassian.net");
//!
//! assert_eq!(engine.convert_to_markdown("h1. Title"), "# Title");
//! assert_eq!(engine.convert_to_dialect("**bold**"), "*bold*");
//! ```

pub mod atlassian;
pub mod engine;
pub mod error;
pub mod html;
pub mod markup;
pub mod mentions;
pub mod users;

pub use engine::{Engine, EngineBuilder};
pub use error::{LookupError, MarkupError};
pub use markup::{Dialect, MarkupText};
