//! Core module containing the data model, store contract and error types

pub mod entity;
pub mod error;
pub mod extractors;
pub mod model;
pub mod schema;
pub mod store;

pub use entity::Entity;
pub use error::{EntityError, LinkError, RelateError, RelateResult, RequestError, StorageError};
pub use model::{
    Category, NewPost, NewUser, Post, PostChanges, PostWithCategories, Profile, User,
    UserWithPosts, UserWithProfile,
};
pub use schema::{EntityKind, FieldDef, FieldType, JoinRelation};
pub use store::{EntityStore, Fields, Record, StoreError, StoreResult, StoreTransaction};
