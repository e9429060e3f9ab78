// src/relay.rs

// flow-relay: mirrors the sum of all inbound flows into one outbound flow.

// dependencies
use crate::address::Address;
use crate::config::RelayConfig;
use crate::context::Context;
use crate::errors::{AppError, HostError, RelayError};
use crate::guard::AccessGuard;
use crate::host::{AgreementCall, AppCheckpoint, Balance, FlowApp, Host};
use crate::ledger::{FlowLedger, FlowRate, LedgerSnapshot};
use crate::termination::TerminationStash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Configuration fixed at initialization, plus what was resolved from the
/// host at that moment.
#[derive(Debug)]
struct Settings {
    config: RelayConfig,
    flow_agreement: Address,
}

// what a host restores when the transaction around a callback fails
#[derive(Debug)]
struct RelayCheckpoint {
    ledger: LedgerSnapshot,
    stash: Option<(Address, FlowRate)>,
}

/// The relay instance.
/// H is the settlement host the relay issues flow instructions to.
///
/// The relay starts uninitialized and becomes active after exactly one
/// successful [`FlowRelay::initialize`]. From then on the outbound flow to the
/// recipient is kept at the ledger total after every successful callback.
#[derive(Debug)]
pub struct FlowRelay<H: Host> {
    address: Address,
    host: Arc<H>,
    settings: OnceLock<Settings>,
    ledger: FlowLedger,
    stash: TerminationStash,
    absorbed_failures: AtomicU64,
}

impl<H: Host> FlowRelay<H> {
    /// Create an uninitialized relay living at `address`.
    pub fn new(address: Address, host: Arc<H>) -> Self {
        Self {
            address,
            host,
            settings: OnceLock::new(),
            ledger: FlowLedger::new(),
            stash: TerminationStash::new(),
            absorbed_failures: AtomicU64::new(0),
        }
    }

    // method to create and initialize a relay from a config object
    pub fn with_config(address: Address, host: Arc<H>, config: RelayConfig) -> Result<Self, RelayError> {
        let relay = Self::new(address, host);
        relay.initialize(config)?;
        Ok(relay)
    }

    /// One-shot initialization. Any call after the first successful one fails,
    /// whatever its arguments.
    pub fn initialize(&self, config: RelayConfig) -> Result<(), RelayError> {
        if self.settings.get().is_some() {
            return Err(RelayError::AlreadyInitialized);
        }
        config.validate()?;
        let settings = Settings {
            flow_agreement: self.host.flow_agreement(),
            config,
        };
        self.settings
            .set(settings)
            .map_err(|_| RelayError::AlreadyInitialized)?;
        debug!(relay = %self.address, "relay initialized");
        Ok(())
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_initialized(&self) -> bool {
        self.settings.get().is_some()
    }

    pub fn config(&self) -> Option<&RelayConfig> {
        self.settings.get().map(|settings| &settings.config)
    }

    /// Aggregate of all active inbound rates; what the outbound flow is asked to carry.
    pub fn ledger_total(&self) -> FlowRate {
        self.ledger.total()
    }

    pub fn inbound_rate(&self, sender: &Address) -> FlowRate {
        self.ledger.rate_of(sender)
    }

    pub fn active_senders(&self) -> Vec<Address> {
        self.ledger.senders()
    }

    /// Number of outbound adjustments that failed during a termination and
    /// were absorbed.
    pub fn absorbed_failures(&self) -> u64 {
        self.absorbed_failures.load(Ordering::Relaxed)
    }

    pub fn on_flow_created(&self, call: &AgreementCall, ctx: Context) -> Result<Context, RelayError> {
        self.apply_inbound(call, ctx, "created")
    }

    pub fn on_flow_updated(&self, call: &AgreementCall, ctx: Context) -> Result<Context, RelayError> {
        self.apply_inbound(call, ctx, "updated")
    }

    /// First half of a close: remember the sender's rate while it still exists.
    pub fn on_flow_terminating(&self, call: &AgreementCall, ctx: &Context) -> Result<(), RelayError> {
        self.authorize(call, ctx)?;
        if call.receiver != self.address {
            return Ok(());
        }
        let rate = self.ledger.rate_of(&call.sender);
        self.stash.capture(call.sender, rate);
        debug!(relay = %self.address, sender = %call.sender, rate, "termination captured");
        Ok(())
    }

    /// Second half of a close. Bookkeeping always completes; the outbound
    /// adjustment is best-effort and its failure never fails this callback.
    ///
    /// The sender's ledger entry is what gets removed. A rate captured by
    /// [`FlowRelay::on_flow_terminating`] only cross-checks it.
    pub fn on_flow_terminated(&self, call: &AgreementCall, ctx: Context) -> Result<Context, RelayError> {
        let settings = self.authorize(call, &ctx)?;
        if call.sender == self.address {
            // the recipient closed our outbound flow; the next callback re-opens it at the ledger total
            warn!(
                relay = %self.address,
                receiver = %call.receiver,
                total = self.ledger.total(),
                "outbound flow closed by counterparty"
            );
            return Ok(ctx);
        }
        if call.receiver != self.address {
            return Ok(ctx);
        }

        let captured = self.stash.take_for(&call.sender);
        let removed = self.ledger.remove(&call.sender)?;
        if let Some(rate) = captured.filter(|rate| *rate != removed) {
            warn!(
                relay = %self.address,
                sender = %call.sender,
                captured = rate,
                removed,
                "captured rate differs from ledger entry"
            );
        }
        let target = self.ledger.total();

        let fallback = ctx.clone();
        match self.adjust_outbound(settings, target, ctx) {
            Ok(next) => {
                debug!(relay = %self.address, sender = %call.sender, removed, target, "flow terminated");
                Ok(next)
            }
            Err(err) => {
                self.absorbed_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    relay = %self.address,
                    sender = %call.sender,
                    target,
                    error = %err,
                    "outbound adjustment failed during termination, absorbed"
                );
                Ok(fallback)
            }
        }
    }

    /// Sweep the relay's whole balance to the recipient. Returns the amount
    /// moved; an empty balance moves nothing.
    pub fn withdraw(&self) -> Result<Balance, RelayError> {
        let settings = self.settings()?;
        let asset = settings.config.asset;
        let recipient = settings.config.recipient;

        let balance = self.host.balance_of(asset, self.address)?;
        if balance <= 0 {
            debug!(relay = %self.address, balance = %balance, "nothing to withdraw");
            return Ok(0);
        }
        self.host.transfer(asset, self.address, recipient, balance)?;
        info!(relay = %self.address, %recipient, amount = %balance, "dust withdrawn");
        Ok(balance)
    }

    fn settings(&self) -> Result<&Settings, RelayError> {
        self.settings.get().ok_or(RelayError::NotInitialized)
    }

    fn authorize(&self, call: &AgreementCall, ctx: &Context) -> Result<&Settings, RelayError> {
        let settings = self.settings()?;
        AccessGuard::new(
            self.address,
            &settings.config,
            settings.flow_agreement,
            self.host.as_ref(),
        )
        .check(call, ctx)?;
        Ok(settings)
    }

    // shared by create and update: both set the sender's entry to the host's current rate
    fn apply_inbound(&self, call: &AgreementCall, ctx: Context, event: &'static str) -> Result<Context, RelayError> {
        let settings = self.authorize(call, &ctx)?;
        if call.receiver != self.address {
            return Ok(ctx);
        }

        let rate = self
            .host
            .flow_rate(settings.config.asset, call.sender, self.address)?
            .unwrap_or(0);
        let minimum = settings.config.min_flow_rate;
        if rate < minimum {
            return Err(RelayError::LowFlowRate { rate, minimum });
        }

        let target = self.ledger.projected_total(&call.sender, rate)?;
        let ctx = self.adjust_outbound(settings, target, ctx)?;
        self.ledger.record(call.sender, rate)?;
        debug!(relay = %self.address, sender = %call.sender, rate, target, event, "inbound flow applied");
        Ok(ctx)
    }

    // bring the outbound flow to `target`, opening or closing it as needed
    fn adjust_outbound(&self, settings: &Settings, target: FlowRate, ctx: Context) -> Result<Context, HostError> {
        let asset = settings.config.asset;
        let recipient = settings.config.recipient;
        let current = self.host.flow_rate(asset, self.address, recipient)?;
        match (current, target) {
            (None, 0) => Ok(ctx),
            (None, rate) => self.host.create_flow_with_context(ctx, asset, recipient, rate),
            (Some(_), 0) => self
                .host
                .delete_flow_with_context(ctx, asset, self.address, recipient),
            (Some(_), rate) => self.host.update_flow_with_context(ctx, asset, recipient, rate),
        }
    }
}

impl<H: Host> FlowApp for FlowRelay<H> {
    fn after_agreement_created(&self, call: &AgreementCall, ctx: Context) -> Result<Context, AppError> {
        self.on_flow_created(call, ctx).map_err(Into::into)
    }

    fn after_agreement_updated(&self, call: &AgreementCall, ctx: Context) -> Result<Context, AppError> {
        self.on_flow_updated(call, ctx).map_err(Into::into)
    }

    fn before_agreement_terminated(&self, call: &AgreementCall, ctx: &Context) -> Result<(), AppError> {
        self.on_flow_terminating(call, ctx).map_err(Into::into)
    }

    fn after_agreement_terminated(&self, call: &AgreementCall, ctx: Context) -> Result<Context, AppError> {
        self.on_flow_terminated(call, ctx).map_err(Into::into)
    }

    // the absorbed-failure counter is a log of attempts and is not rolled back
    fn checkpoint(&self) -> Option<AppCheckpoint> {
        Some(Box::new(RelayCheckpoint {
            ledger: self.ledger.snapshot(),
            stash: self.stash.slot(),
        }))
    }

    fn restore(&self, checkpoint: AppCheckpoint) {
        match checkpoint.downcast::<RelayCheckpoint>() {
            Ok(checkpoint) => {
                let RelayCheckpoint { ledger, stash } = *checkpoint;
                self.ledger.restore(ledger);
                self.stash.restore(stash);
                debug!(relay = %self.address, total = self.ledger.total(), "rolled back");
            }
            Err(_) => warn!(relay = %self.address, "ignored checkpoint of another app"),
        }
    }
}
