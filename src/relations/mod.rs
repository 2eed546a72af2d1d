//! Relationship management
//!
//! Encodes the one-to-one (user/profile), one-to-many (user/posts) and
//! many-to-many (posts/categories) relations as explicit link operations
//! on top of the entity store.

pub mod changes;
pub mod handlers;
pub mod manager;
mod session;

pub use changes::{CategoryChanges, LinkPlan};
pub use handlers::AppState;
pub use manager::RelationshipManager;
