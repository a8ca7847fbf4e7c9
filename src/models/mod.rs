//! SeaORM entity models and shared API types.

use serde::Serialize;
use utoipa::ToSchema;

pub mod ad_account;
pub mod connection;
pub mod page;

/// Basic service information returned by the root endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            status: "ok",
        }
    }
}
