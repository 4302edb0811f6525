//! Data models for documents, results and configuration.

pub mod config;
pub mod document;
