//! HTTP API handlers for kweb-server

pub mod health;
pub mod topics;
pub mod tree;

pub use health::health_routes;
pub use topics::topic_routes;
pub use tree::tree_routes;
