// src/host.rs

// host and app traits: the two sides of the settlement boundary

// dependencies
use crate::address::Address;
use crate::context::Context;
use crate::errors::{AppError, HostError};
use crate::ledger::FlowRate;
use std::any::Any;
use std::sync::Weak;

/// Signed token balance. Real-time balances of streaming accounts can go
/// negative on a host that does not liquidate.
pub type Balance = i128;

/// The settlement host: owns flow state and executes flow instructions.
///
/// Context-taking operations act on behalf of `ctx.app()`. Each one consumes
/// the context it is given and returns the successor to thread onwards; a
/// failed operation leaves host state and the caller's context untouched.
pub trait Host: Send + Sync {
    /// Address the host presents as caller when delivering callbacks.
    fn address(&self) -> Address;

    /// Address of the streaming-agreement module callbacks originate from.
    fn flow_agreement(&self) -> Address;

    fn is_context_valid(&self, ctx: &Context) -> bool;

    /// Rate of the flow from `sender` to `receiver`, `None` when no flow is open.
    fn flow_rate(
        &self,
        asset: Address,
        sender: Address,
        receiver: Address,
    ) -> Result<Option<FlowRate>, HostError>;

    fn create_flow_with_context(
        &self,
        ctx: Context,
        asset: Address,
        receiver: Address,
        rate: FlowRate,
    ) -> Result<Context, HostError>;

    fn update_flow_with_context(
        &self,
        ctx: Context,
        asset: Address,
        receiver: Address,
        rate: FlowRate,
    ) -> Result<Context, HostError>;

    fn delete_flow_with_context(
        &self,
        ctx: Context,
        asset: Address,
        sender: Address,
        receiver: Address,
    ) -> Result<Context, HostError>;

    fn balance_of(&self, asset: Address, account: Address) -> Result<Balance, HostError>;

    fn transfer(
        &self,
        asset: Address,
        from: Address,
        to: Address,
        amount: Balance,
    ) -> Result<(), HostError>;

    /// Make `app` eligible for callbacks. Hosts without a callback registry
    /// accept and ignore the registration.
    fn register_app(&self, _app: Address, _hooks: Weak<dyn FlowApp>) -> Result<(), HostError> {
        Ok(())
    }
}

/// Payload of a lifecycle callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgreementCall {
    /// Who invoked the callback; the relay only trusts its configured host.
    pub caller: Address,
    pub asset: Address,
    /// Agreement module that produced the event.
    pub agreement: Address,
    pub sender: Address,
    pub receiver: Address,
}

/// Opaque app state a host holds while a transaction is open.
pub type AppCheckpoint = Box<dyn Any + Send>;

/// Lifecycle callbacks a host delivers to a registered app.
///
/// Hosts roll app state back together with their own: before a transaction
/// they take a [`FlowApp::checkpoint`] of every registered app and hand it
/// back through [`FlowApp::restore`] if the transaction fails. Stateless apps
/// keep the defaults.
pub trait FlowApp: Send + Sync {
    fn after_agreement_created(&self, call: &AgreementCall, ctx: Context) -> Result<Context, AppError>;

    fn after_agreement_updated(&self, call: &AgreementCall, ctx: Context) -> Result<Context, AppError>;

    /// Fired while the flow still exists at the host.
    fn before_agreement_terminated(&self, call: &AgreementCall, ctx: &Context) -> Result<(), AppError>;

    /// Fired once the flow is gone at the host.
    fn after_agreement_terminated(&self, call: &AgreementCall, ctx: Context) -> Result<Context, AppError>;

    fn checkpoint(&self) -> Option<AppCheckpoint> {
        None
    }

    fn restore(&self, _checkpoint: AppCheckpoint) {}
}
