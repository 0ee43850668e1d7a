//! Folio - a personal blog backend
//!
//! Articles, categories and tags over SQLite or MySQL. Every article write
//! runs in one transaction that also keeps the category and tag usage
//! counters in step.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
