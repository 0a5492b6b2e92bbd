//! Natural-language reconciliation over a personal task/schedule/log store.
//!
//! The pipeline turns raw user text into structured mutations: a Gemini
//! call with ordered model fallback, defensive normalization and schema
//! validation of the returned JSON, fuzzy title resolution of referenced
//! items, and batch application against the in-memory store with debounced
//! persistence.

pub mod cli;
pub mod engine;
pub mod llm;
pub mod models;
pub mod search;
pub mod storage;
pub mod store;
