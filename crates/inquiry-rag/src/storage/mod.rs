//! Storage module for persistent records
//!
//! Provides SQLite-based persistence for documents, chunks, quizzes,
//! conversations, and graph triples.

mod database;

pub use database::{RecordStore, SqliteStore};
