// src/guard.rs

// callback authentication

// dependencies
use crate::address::Address;
use crate::config::RelayConfig;
use crate::context::Context;
use crate::errors::RelayError;
use crate::host::{AgreementCall, Host};

/// Checks a callback before the relay touches any state.
///
/// Order: caller, context, asset, agreement module. The first failing check
/// decides the error. A context passes only if it is the host's live frame
/// and that frame was opened for this relay.
pub(crate) struct AccessGuard<'a, H: Host> {
    relay: Address,
    config: &'a RelayConfig,
    flow_agreement: Address,
    host: &'a H,
}

impl<'a, H: Host> AccessGuard<'a, H> {
    pub(crate) fn new(relay: Address, config: &'a RelayConfig, flow_agreement: Address, host: &'a H) -> Self {
        Self {
            relay,
            config,
            flow_agreement,
            host,
        }
    }

    pub(crate) fn check(&self, call: &AgreementCall, ctx: &Context) -> Result<(), RelayError> {
        if call.caller != self.config.host {
            return Err(RelayError::NotHost {
                caller: call.caller,
            });
        }
        // the caller field is self-reported; only a frame of our own proves the host called
        if ctx.app() != self.relay || !self.host.is_context_valid(ctx) {
            return Err(RelayError::InvalidContext);
        }
        if call.asset != self.config.asset {
            return Err(RelayError::NotAcceptedAsset { asset: call.asset });
        }
        if call.agreement != self.flow_agreement {
            return Err(RelayError::NotFlowAgreement {
                agreement: call.agreement,
            });
        }
        Ok(())
    }
}
