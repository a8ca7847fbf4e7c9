//! # Meta Gateway Library
//!
//! Credential management and reporting gateway between a multi-tenant
//! platform and the Meta Ads Graph API: encrypted token storage, OAuth
//! connection lifecycle, rate limit bookkeeping, and insights retrieval.

pub mod auth;
pub mod breakdowns;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod graph;
pub mod handlers;
pub mod insights;
pub mod models;
pub mod oauth_state;
pub mod rate_limit;
pub mod repositories;
pub mod server;
pub mod services;
pub mod telemetry;
pub use migration;
