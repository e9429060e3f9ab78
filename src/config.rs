// src/config.rs

//! Configuration types for the flow relay

// dependencies
use crate::address::Address;
use crate::errors::RelayError;
use crate::ledger::FlowRate;

/// Immutable configuration a relay is initialized with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub(crate) host: Address,
    pub(crate) asset: Address,
    pub(crate) recipient: Address,
    pub(crate) min_flow_rate: FlowRate,
}

impl RelayConfig {
    /// Create a new configuration from the host, accepted asset, recipient and minimum rate
    pub fn new(host: Address, asset: Address, recipient: Address, min_flow_rate: FlowRate) -> Self {
        Self {
            host,
            asset,
            recipient,
            min_flow_rate,
        }
    }

    /// Builder-style: set the host
    pub fn host(mut self, host: Address) -> Self {
        self.host = host;
        self
    }

    /// Builder-style: set the accepted asset
    pub fn asset(mut self, asset: Address) -> Self {
        self.asset = asset;
        self
    }

    /// Builder-style: set the recipient
    pub fn recipient(mut self, recipient: Address) -> Self {
        self.recipient = recipient;
        self
    }

    /// Builder-style: set the minimum inbound flow rate
    pub fn min_flow_rate(mut self, min_flow_rate: FlowRate) -> Self {
        self.min_flow_rate = min_flow_rate;
        self
    }

    pub fn host_address(&self) -> Address {
        self.host
    }

    pub fn accepted_asset(&self) -> Address {
        self.asset
    }

    pub fn recipient_address(&self) -> Address {
        self.recipient
    }

    pub fn minimum_rate(&self) -> FlowRate {
        self.min_flow_rate
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.host.is_zero() {
            return Err(RelayError::HostRequired);
        }
        if self.asset.is_zero() {
            return Err(RelayError::AssetRequired);
        }
        if self.recipient.is_zero() {
            return Err(RelayError::RecipientRequired);
        }
        if self.min_flow_rate == 0 {
            return Err(RelayError::LowFlowRate {
                rate: 0,
                minimum: 1,
            });
        }
        Ok(())
    }
}
