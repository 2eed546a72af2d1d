//! Server module for building the HTTP server
//!
//! This module provides a `ServerBuilder` that registers:
//! - Health check routes
//! - User, profile, post and category routes backed by a `RelationshipManager`

pub mod builder;
pub mod router;

pub use builder::ServerBuilder;
pub use router::{build_health_routes, build_relation_routes};
