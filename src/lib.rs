//! # relate-rs
//!
//! A REST API over four related entities, built to show the three classic
//! relationship shapes side by side:
//!
//! - **One-to-one**: every `User` owns at most one `Profile`, created and
//!   deleted together with the user
//! - **One-to-many**: a `User` owns any number of `Post`s
//! - **Many-to-many**: `Post`s and `Category`s are joined by link pairs
//!
//! All cross-entity rules live in [`relations::RelationshipManager`], which
//! runs every operation inside one transaction of an [`core::EntityStore`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use relate::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     ServerBuilder::new()
//!         .with_store(InMemoryStore::new())
//!         .with_config(ServerConfig::from_env()?)
//!         .serve()
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod relations;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        Category, Entity, EntityKind, EntityStore, NewPost, NewUser, Post, PostChanges,
        PostWithCategories, Profile, RelateError, RelateResult, StoreTransaction, User,
        UserWithPosts, UserWithProfile,
    };

    // === Relations ===
    pub use crate::relations::{AppState, CategoryChanges, RelationshipManager};

    // === Storage ===
    pub use crate::storage::InMemoryStore;

    // === Config ===
    pub use crate::config::ServerConfig;

    // === Server ===
    pub use crate::server::ServerBuilder;

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
}
