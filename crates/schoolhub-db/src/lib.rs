//! SchoolHub Database Layer
//!
//! Users, roles and schools, behind repository traits with two
//! implementations: SQLite via sqlx and an in-memory store.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use memory::MemoryStore;
pub use models::*;
pub use repository::{Database, SchoolRepository, UserRepository};

/// Re-export sqlx types for convenience
pub use sqlx::SqlitePool;
