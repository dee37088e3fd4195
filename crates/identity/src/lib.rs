//! `shopkeep-identity`: identity resolution engine.
//!
//! Pure engine crate: receives pre-loaded user/order/catalog tables, merges
//! user records that share a normalized phone or email under one canonical
//! ID, and attaches that ID to dependent tables. No CLI dependencies.

pub mod clean;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod loader;
pub mod materialize;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod resolve;

pub use config::IdentityConfig;
pub use engine::run;
pub use error::IdentityError;
pub use graph::{build_graph, IdentityGraph};
pub use model::{IdentityInput, IdentityMapping, IdentityRun, MatchKey, UserId, UserRecord};
pub use resolve::{resolve_components, resolve_user_identities};
