//! Broker REST API client and wire types.

mod client;
mod types;

pub use client::BrokerClient;
pub use types::{AccountBalances, LiveOrder, OrderLeg};
