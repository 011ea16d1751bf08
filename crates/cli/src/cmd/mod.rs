//! Subcommand implementations.

pub mod chain_id;
pub mod connect;
pub mod ensure;
pub mod nft;
pub mod profile;
pub mod stats;
