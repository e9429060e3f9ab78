// tests/relay/fixtures/impostor.rs

// a recipient that calls back into the relay with its own context, posing as the host

// dependencies
use super::test_env::TestRelay;
use flow_relay::{Address, AgreementCall, AppError, Context, FlowApp, RelayError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

pub struct Impostor {
    relay: OnceLock<Weak<TestRelay>>,
    victim: Address,
    attempts: AtomicU64,
    refusals: AtomicU64,
}

impl Impostor {
    /// `victim` is the sender whose close the impostor fakes.
    pub fn new(victim: Address) -> Self {
        Self {
            relay: OnceLock::new(),
            victim,
            attempts: AtomicU64::new(0),
            refusals: AtomicU64::new(0),
        }
    }

    pub fn target(&self, relay: &Arc<TestRelay>) {
        let _ = self.relay.set(Arc::downgrade(relay));
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Attempts the relay turned away with `InvalidContext`.
    pub fn refusals(&self) -> u64 {
        self.refusals.load(Ordering::Relaxed)
    }

    fn fake_close(&self, call: &AgreementCall, ctx: &Context) {
        let Some(relay) = self.relay.get().and_then(Weak::upgrade) else {
            return;
        };
        let forged = AgreementCall {
            sender: self.victim,
            receiver: relay.address(),
            ..*call
        };
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if matches!(
            relay.on_flow_terminated(&forged, ctx.clone()),
            Err(RelayError::InvalidContext)
        ) {
            self.refusals.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl FlowApp for Impostor {
    fn after_agreement_created(&self, _call: &AgreementCall, ctx: Context) -> Result<Context, AppError> {
        Ok(ctx)
    }

    fn after_agreement_updated(&self, call: &AgreementCall, ctx: Context) -> Result<Context, AppError> {
        self.fake_close(call, &ctx);
        Ok(ctx)
    }

    fn before_agreement_terminated(&self, _call: &AgreementCall, _ctx: &Context) -> Result<(), AppError> {
        Ok(())
    }

    fn after_agreement_terminated(&self, _call: &AgreementCall, ctx: Context) -> Result<Context, AppError> {
        Ok(ctx)
    }
}
