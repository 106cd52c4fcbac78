// src/db/models/mod.rs

//! Data models for catalog database entities
//!
//! This module defines Rust structs that correspond to database tables
//! and provides methods for creating, reading, updating, and deleting records.

mod apk;
mod app;
mod repository;

pub use apk::Apk;
pub use app::App;
pub use repository::{RepoMirror, Repository};
