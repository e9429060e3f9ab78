// src/factory.rs

// owner-gated deployment of relay instances

// dependencies
use crate::address::Address;
use crate::config::RelayConfig;
use crate::errors::RelayError;
use crate::host::{FlowApp, Host};
use crate::relay::FlowRelay;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::info;

/// Record of one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayDeployed {
    pub relay: Address,
    pub config: RelayConfig,
}

/// Deploys relays on a host: derives an address, runs the one-time
/// initialization and registers the instance for callbacks.
#[derive(Debug)]
pub struct RelayFactory<H: Host> {
    address: Address,
    owner: Address,
    host: Arc<H>,
    nonce: AtomicU64,
    deployments: Mutex<Vec<RelayDeployed>>,
}

impl<H: Host + 'static> RelayFactory<H> {
    pub fn new(address: Address, owner: Address, host: Arc<H>) -> Self {
        Self {
            address,
            owner,
            host,
            nonce: AtomicU64::new(0),
            deployments: Mutex::new(Vec::new()),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn deploy(&self, caller: Address, config: RelayConfig) -> Result<Arc<FlowRelay<H>>, RelayError> {
        if caller != self.owner {
            return Err(RelayError::NotOwner { caller });
        }
        config.validate()?;

        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        let address = Address::derive(self.address, nonce);
        let relay = Arc::new(FlowRelay::new(address, Arc::clone(&self.host)));
        relay.initialize(config.clone())?;

        let hooks: Weak<dyn FlowApp> = Arc::downgrade(&relay) as Weak<dyn FlowApp>;
        self.host.register_app(address, hooks)?;

        info!(
            factory = %self.address,
            relay = %address,
            host = %config.host,
            asset = %config.asset,
            recipient = %config.recipient,
            min_flow_rate = config.min_flow_rate,
            "relay deployed"
        );
        self.deployments.lock().push(RelayDeployed {
            relay: address,
            config,
        });
        Ok(relay)
    }

    /// Deployments in the order they happened.
    pub fn deployments(&self) -> Vec<RelayDeployed> {
        self.deployments.lock().clone()
    }
}
