//! HTTP surface: common routes plus the catch-all REST dispatcher.

mod handlers;
mod routes;

pub use routes::{common_routes_with_ready, rest_routes};
