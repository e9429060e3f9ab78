// src/errors.rs

// error handling for the relay, its factory and the settlement host

// dependencies
use thiserror::Error;

use crate::address::Address;
use crate::clock::ClockError;
use crate::ledger::FlowRate;

/// Error an app returns from a callback. The host only needs to report it,
/// so any error type may cross the boundary.
pub type AppError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for relay callbacks, initialization and the factory.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RelayError {
    // authentication
    #[error("caller {caller} is not the configured host")]
    NotHost { caller: Address },
    #[error("asset {asset} is not the accepted asset")]
    NotAcceptedAsset { asset: Address },
    #[error("agreement {agreement} is not the flow agreement")]
    NotFlowAgreement { agreement: Address },
    #[error("continuation context is not valid for the current host call")]
    InvalidContext,

    // policy
    #[error("flow rate {rate} is below the minimum of {minimum}")]
    LowFlowRate { rate: FlowRate, minimum: FlowRate },

    // configuration
    #[error("host address is required")]
    HostRequired,
    #[error("asset address is required")]
    AssetRequired,
    #[error("recipient address is required")]
    RecipientRequired,
    #[error("relay is already initialized")]
    AlreadyInitialized,
    #[error("relay is not initialized")]
    NotInitialized,
    #[error("caller {caller} is not the factory owner")]
    NotOwner { caller: Address },

    // invariant
    #[error("ledger corrupted: removing {rate} for {sender} from an aggregate of {total}")]
    LedgerCorrupted {
        sender: Address,
        rate: FlowRate,
        total: FlowRate,
    },
    #[error("aggregate flow rate overflow")]
    RateOverflow,

    // downstream
    #[error("host instruction failed: {0}")]
    Host(#[from] HostError),
}

/// Error type reported by a settlement host.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HostError {
    #[error("continuation context is not valid")]
    InvalidContext,
    #[error("flow rate {0} is not valid")]
    InvalidFlowRate(FlowRate),
    #[error("flow from {sender} to {receiver} already exists")]
    FlowExists { sender: Address, receiver: Address },
    #[error("flow from {sender} to {receiver} does not exist")]
    FlowNotFound { sender: Address, receiver: Address },
    #[error("{caller} is not a party to the flow")]
    NotFlowParty { caller: Address },
    #[error("app {0} is jailed")]
    AppJailed(Address),
    #[error("app {app} reverted: {source}")]
    AppReverted {
        app: Address,
        #[source]
        source: AppError,
    },
    #[error("transfer amount {0} is not valid")]
    InvalidAmount(i128),
    #[error("account {account} holds {available}, cannot move {requested}")]
    InsufficientBalance {
        account: Address,
        available: i128,
        requested: i128,
    },
    #[error("host unavailable: {0}")]
    Unavailable(String),
    #[error("host clock failed")]
    Clock(#[from] ClockError),
}
