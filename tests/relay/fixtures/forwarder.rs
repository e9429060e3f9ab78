// tests/relay/fixtures/forwarder.rs

// an app that passes every incoming flow on from inside its own callback

// dependencies
use super::test_clock::TestClock;
use flow_relay::{Address, AgreementCall, AppError, Context, FlowApp, FlowRate, Host, LocalHost};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("forwarder reverted after forwarding")]
pub struct ForwarderReverted;

pub struct Forwarder {
    host: Arc<LocalHost<TestClock>>,
    asset: Address,
    target: Address,
    rate: FlowRate,
    fail_after_forwarding: AtomicBool,
}

impl Forwarder {
    pub fn new(host: Arc<LocalHost<TestClock>>, asset: Address, target: Address, rate: FlowRate) -> Self {
        Self {
            host,
            asset,
            target,
            rate,
            fail_after_forwarding: AtomicBool::new(false),
        }
    }

    /// Open the onward flow, then revert anyway.
    pub fn fail_after_forwarding(&self, fail: bool) {
        self.fail_after_forwarding.store(fail, Ordering::Relaxed);
    }
}

impl FlowApp for Forwarder {
    fn after_agreement_created(&self, _call: &AgreementCall, ctx: Context) -> Result<Context, AppError> {
        let ctx = self
            .host
            .create_flow_with_context(ctx, self.asset, self.target, self.rate)?;
        if self.fail_after_forwarding.load(Ordering::Relaxed) {
            return Err(ForwarderReverted.into());
        }
        Ok(ctx)
    }

    fn after_agreement_updated(&self, _call: &AgreementCall, ctx: Context) -> Result<Context, AppError> {
        Ok(ctx)
    }

    fn before_agreement_terminated(&self, _call: &AgreementCall, _ctx: &Context) -> Result<(), AppError> {
        Ok(())
    }

    fn after_agreement_terminated(&self, _call: &AgreementCall, ctx: Context) -> Result<Context, AppError> {
        Ok(ctx)
    }
}
