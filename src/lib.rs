// src/lib.rs

//! # Flow Relay
//!
//! Aggregates any number of inbound payment flows into one outbound flow to a
//! fixed recipient, driven entirely by the settlement host's lifecycle
//! callbacks.
//!
//! ## Quick Example
//!
//! ```rust
//! use std::sync::Arc;
//! use flow_relay::{Address, LocalHost, LocalHostConfig, RelayConfig, RelayFactory, SystemClock};
//!
//! let host_address = Address::from_low_u64(1);
//! let host = Arc::new(
//!     LocalHost::with_config(
//!         LocalHostConfig::new(host_address, Address::from_low_u64(2)),
//!         SystemClock,
//!     )
//!     .unwrap(),
//! );
//!
//! let (owner, asset, recipient, sender) = (
//!     Address::from_low_u64(10),
//!     Address::from_low_u64(11),
//!     Address::from_low_u64(12),
//!     Address::from_low_u64(13),
//! );
//! let factory = RelayFactory::new(Address::from_low_u64(3), owner, Arc::clone(&host));
//! let relay = factory
//!     .deploy(owner, RelayConfig::new(host_address, asset, recipient, 1000))
//!     .unwrap();
//!
//! host.create_flow(sender, asset, relay.address(), 1500).unwrap();
//! assert_eq!(relay.ledger_total(), 1500);
//! ```

// private modules
mod address;
mod clock;
mod config;
mod context;
mod errors;
mod factory;
mod guard;
mod host;
mod ledger;
mod local_host;
mod relay;
mod termination;

// public API exports
pub use address::Address;
pub use clock::{Clock, ClockError, SystemClock};
pub use config::RelayConfig;
pub use context::Context;
pub use errors::{AppError, HostError, RelayError};
pub use factory::{RelayDeployed, RelayFactory};
pub use host::{AgreementCall, AppCheckpoint, Balance, FlowApp, Host};
pub use ledger::FlowRate;
pub use local_host::{LocalHost, LocalHostConfig};
pub use relay::FlowRelay;
