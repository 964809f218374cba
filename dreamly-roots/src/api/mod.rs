//! HTTP API handlers for dreamly-roots

pub mod admin;
pub mod dreams;
pub mod health;
pub mod map;
pub mod shared;

pub use admin::admin_routes;
pub use dreams::dream_routes;
pub use health::health_routes;
pub use map::map_routes;
pub use shared::shared_routes;
