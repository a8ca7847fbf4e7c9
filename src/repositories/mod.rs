//! Repository layer encapsulating SeaORM operations.

pub mod ad_account;
pub mod connection;
pub mod page;

pub use ad_account::{AccountLookup, AdAccountRepository};
pub use connection::ConnectionRepository;
pub use page::PageRepository;
