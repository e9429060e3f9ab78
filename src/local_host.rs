// src/local_host.rs

// in-memory settlement host: flow state, real-time balances, callbacks and jailing

// dependencies
use crate::address::Address;
use crate::clock::{Clock, SystemClock};
use crate::context::Context;
use crate::errors::{AppError, HostError};
use crate::host::{AgreementCall, AppCheckpoint, Balance, FlowApp, Host};
use crate::ledger::FlowRate;
use dashmap::DashMap;
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Configuration for the local host
#[derive(Debug, Clone)]
pub struct LocalHostConfig {
    pub(crate) address: Address,
    pub(crate) flow_agreement: Address,
    pub(crate) granularity: FlowRate,
}

impl LocalHostConfig {
    pub fn new(address: Address, flow_agreement: Address) -> Self {
        Self {
            address,
            flow_agreement,
            granularity: 1,
        }
    }

    /// Builder-style: flows opened from a context settle at a multiple of this
    pub fn granularity(mut self, granularity: FlowRate) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn validate(&self) -> Result<(), HostError> {
        if self.granularity == 0 {
            return Err(HostError::InvalidFlowRate(0));
        }
        Ok(())
    }
}

// who started the operation being executed
#[derive(Debug, Clone, Copy)]
enum Origin {
    External,
    App(Address),
}

impl Origin {
    fn app(&self) -> Option<Address> {
        match self {
            Origin::External => None,
            Origin::App(app) => Some(*app),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FlowEvent {
    Created,
    Updated,
}

#[derive(Debug, Clone, Default)]
struct Account {
    static_balance: i128,
    net_rate: i128,
    settled_at: u64,
}

impl Account {
    fn balance_at(&self, now: u64) -> Balance {
        let elapsed = now.saturating_sub(self.settled_at) as i128;
        self.static_balance + self.net_rate * elapsed
    }

    fn settle(&mut self, now: u64) {
        self.static_balance = self.balance_at(now);
        self.settled_at = now;
    }
}

// (asset, sender, receiver)
type FlowKey = (Address, Address, Address);

#[derive(Debug, Clone, Default)]
struct HostState {
    flows: HashMap<FlowKey, FlowRate>,
    accounts: HashMap<(Address, Address), Account>,
    jailed: HashSet<Address>,
}

impl HostState {
    fn account_mut(&mut self, asset: Address, account: Address, now: u64) -> &mut Account {
        let entry = self.accounts.entry((asset, account)).or_default();
        entry.settle(now);
        entry
    }
}

// host state plus the checkpoint of every live app, taken together
struct Snapshot {
    state: HostState,
    apps: Vec<(Arc<dyn FlowApp>, AppCheckpoint)>,
}

/// A settlement host kept entirely in memory.
///
/// Every operation is a transaction: host state and the checkpoints of all
/// registered apps are taken on entry and restored if the operation, or any
/// callback it triggers, fails. Operations are serialized. Callbacks run
/// without any state lock held, so apps may call back into the host with the
/// context they were given.
pub struct LocalHost<C: Clock = SystemClock> {
    address: Address,
    flow_agreement: Address,
    granularity: FlowRate,
    clock: C,
    state: Mutex<HostState>,
    apps: DashMap<Address, Weak<dyn FlowApp>>,
    frames: Mutex<Vec<Context>>,
    next_stamp: AtomicU64,
    serial: ReentrantMutex<()>,
}

impl<C: Clock> LocalHost<C> {
    pub fn with_config(config: LocalHostConfig, clock: C) -> Result<Self, HostError> {
        config.validate()?;
        Ok(Self {
            address: config.address,
            flow_agreement: config.flow_agreement,
            granularity: config.granularity,
            clock,
            state: Mutex::new(HostState::default()),
            apps: DashMap::new(),
            frames: Mutex::new(Vec::new()),
            next_stamp: AtomicU64::new(0),
            serial: ReentrantMutex::new(()),
        })
    }

    pub fn granularity(&self) -> FlowRate {
        self.granularity
    }

    pub fn is_jailed(&self, app: &Address) -> bool {
        self.state.lock().jailed.contains(app)
    }

    /// Credit `amount` to `account` out of thin air.
    pub fn mint(&self, asset: Address, account: Address, amount: Balance) -> Result<(), HostError> {
        if amount <= 0 {
            return Err(HostError::InvalidAmount(amount));
        }
        let now = self.now_secs()?;
        self.state.lock().account_mut(asset, account, now).static_balance += amount;
        Ok(())
    }

    /// Open a flow on behalf of an external account.
    pub fn create_flow(
        &self,
        sender: Address,
        asset: Address,
        receiver: Address,
        rate: FlowRate,
    ) -> Result<(), HostError> {
        self.transact(|| self.open_flow(Origin::External, asset, sender, receiver, rate))
    }

    pub fn update_flow(
        &self,
        sender: Address,
        asset: Address,
        receiver: Address,
        rate: FlowRate,
    ) -> Result<(), HostError> {
        self.transact(|| self.change_flow(Origin::External, asset, sender, receiver, rate))
    }

    /// Close a flow; either party may do so.
    pub fn delete_flow(
        &self,
        caller: Address,
        asset: Address,
        sender: Address,
        receiver: Address,
    ) -> Result<(), HostError> {
        if caller != sender && caller != receiver {
            return Err(HostError::NotFlowParty { caller });
        }
        self.transact(|| self.close_flow(Origin::External, asset, sender, receiver))
    }

    fn now_secs(&self) -> Result<u64, HostError> {
        Ok(self.clock.now()? / NANOS_PER_SECOND)
    }

    // the serial lock is reentrant: nested operations run on the same thread
    fn transact<T>(&self, op: impl FnOnce() -> Result<T, HostError>) -> Result<T, HostError> {
        let _serial = self.serial.lock();
        let snapshot = self.snapshot();
        let result = op();
        if result.is_err() {
            self.rollback(snapshot);
        }
        result
    }

    fn snapshot(&self) -> Snapshot {
        let live: Vec<Arc<dyn FlowApp>> = self
            .apps
            .iter()
            .filter_map(|entry| entry.value().upgrade())
            .collect();
        let apps = live
            .into_iter()
            .filter_map(|app| app.checkpoint().map(|checkpoint| (app, checkpoint)))
            .collect();
        Snapshot {
            state: self.state.lock().clone(),
            apps,
        }
    }

    fn rollback(&self, snapshot: Snapshot) {
        *self.state.lock() = snapshot.state;
        for (app, checkpoint) in snapshot.apps {
            app.restore(checkpoint);
        }
    }

    fn settled_rate(&self, origin: Origin, rate: FlowRate) -> Result<FlowRate, HostError> {
        let settled = match origin {
            Origin::External => rate,
            Origin::App(_) => rate - rate % self.granularity,
        };
        if settled == 0 {
            return Err(HostError::InvalidFlowRate(rate));
        }
        Ok(settled)
    }

    fn check_receiver(&self, receiver: Address) -> Result<(), HostError> {
        if self.is_jailed(&receiver) {
            return Err(HostError::AppJailed(receiver));
        }
        Ok(())
    }

    fn open_flow(
        &self,
        origin: Origin,
        asset: Address,
        sender: Address,
        receiver: Address,
        rate: FlowRate,
    ) -> Result<(), HostError> {
        if sender == receiver {
            return Err(HostError::InvalidFlowRate(rate));
        }
        self.check_receiver(receiver)?;
        let settled = self.settled_rate(origin, rate)?;
        if self.state.lock().flows.contains_key(&(asset, sender, receiver)) {
            return Err(HostError::FlowExists { sender, receiver });
        }
        self.write_flow(asset, sender, receiver, Some(settled))?;
        self.notify(origin, asset, sender, receiver, FlowEvent::Created)
    }

    fn change_flow(
        &self,
        origin: Origin,
        asset: Address,
        sender: Address,
        receiver: Address,
        rate: FlowRate,
    ) -> Result<(), HostError> {
        self.check_receiver(receiver)?;
        let settled = self.settled_rate(origin, rate)?;
        if !self.state.lock().flows.contains_key(&(asset, sender, receiver)) {
            return Err(HostError::FlowNotFound { sender, receiver });
        }
        self.write_flow(asset, sender, receiver, Some(settled))?;
        self.notify(origin, asset, sender, receiver, FlowEvent::Updated)
    }

    // termination never fails because of an app: a failing callback jails that app instead
    fn close_flow(
        &self,
        origin: Origin,
        asset: Address,
        sender: Address,
        receiver: Address,
    ) -> Result<(), HostError> {
        if !self.state.lock().flows.contains_key(&(asset, sender, receiver)) {
            return Err(HostError::FlowNotFound { sender, receiver });
        }
        let call = self.agreement_call(asset, sender, receiver);
        let parties: Vec<(Address, Arc<dyn FlowApp>)> = [receiver, sender]
            .into_iter()
            .filter_map(|party| self.callee(origin, party).map(|app| (party, app)))
            .collect();

        for (party, app) in &parties {
            let outcome = self.call_app(*party, |ctx| {
                app.before_agreement_terminated(&call, &ctx).map(|()| None)
            });
            if let Err(err) = outcome {
                self.jail(*party, &err);
            }
        }

        self.write_flow(asset, sender, receiver, None)?;

        for (party, app) in &parties {
            if self.is_jailed(party) {
                continue;
            }
            let outcome = self.call_app(*party, |ctx| app.after_agreement_terminated(&call, ctx).map(Some));
            if let Err(err) = outcome {
                self.jail(*party, &err);
            }
        }
        Ok(())
    }

    fn notify(
        &self,
        origin: Origin,
        asset: Address,
        sender: Address,
        receiver: Address,
        event: FlowEvent,
    ) -> Result<(), HostError> {
        let Some(app) = self.callee(origin, receiver) else {
            return Ok(());
        };
        let call = self.agreement_call(asset, sender, receiver);
        self.call_app(receiver, |ctx| match event {
            FlowEvent::Created => app.after_agreement_created(&call, ctx).map(Some),
            FlowEvent::Updated => app.after_agreement_updated(&call, ctx).map(Some),
        })
        .map_err(|source| HostError::AppReverted {
            app: receiver,
            source,
        })
    }

    fn agreement_call(&self, asset: Address, sender: Address, receiver: Address) -> AgreementCall {
        AgreementCall {
            caller: self.address,
            asset,
            agreement: self.flow_agreement,
            sender,
            receiver,
        }
    }

    // the registered, live, unjailed app at `party`, unless it started this operation
    fn callee(&self, origin: Origin, party: Address) -> Option<Arc<dyn FlowApp>> {
        if origin.app() == Some(party) || self.is_jailed(&party) {
            return None;
        }
        self.apps.get(&party).and_then(|entry| entry.value().upgrade())
    }

    // run one callback inside a fresh context frame. Host effects of a failing
    // callback are undone; a returned context must be the frame's current one.
    fn call_app(
        &self,
        app: Address,
        hook: impl FnOnce(Context) -> Result<Option<Context>, AppError>,
    ) -> Result<(), AppError> {
        let snapshot = self.snapshot();
        let ctx = Context::new(app, self.mint_stamp());
        self.frames.lock().push(ctx.clone());
        let result = hook(ctx);
        let top = self.frames.lock().pop();

        let outcome = match result {
            Ok(Some(returned)) if Some(&returned) != top.as_ref() => {
                Err(AppError::from("callback returned a stale context"))
            }
            Ok(_) => Ok(()),
            Err(err) => Err(err),
        };
        if outcome.is_err() {
            self.rollback(snapshot);
        }
        outcome
    }

    fn jail(&self, app: Address, reason: &AppError) {
        warn!(host = %self.address, %app, reason = %reason, "app jailed");
        self.state.lock().jailed.insert(app);
    }

    fn mint_stamp(&self) -> u64 {
        self.next_stamp.fetch_add(1, Ordering::Relaxed) + 1
    }

    // run a context-originated operation and rotate the caller's frame
    fn within_context(
        &self,
        ctx: Context,
        op: impl FnOnce(Address) -> Result<(), HostError>,
    ) -> Result<Context, HostError> {
        if !self.is_context_valid(&ctx) {
            return Err(HostError::InvalidContext);
        }
        let app = ctx.app();
        self.transact(|| op(app))?;

        let next = Context::new(app, self.mint_stamp());
        match self.frames.lock().last_mut() {
            Some(top) => *top = next.clone(),
            None => return Err(HostError::InvalidContext),
        }
        Ok(next)
    }

    fn write_flow(
        &self,
        asset: Address,
        sender: Address,
        receiver: Address,
        rate: Option<FlowRate>,
    ) -> Result<(), HostError> {
        let now = self.now_secs()?;
        let mut state = self.state.lock();
        let key = (asset, sender, receiver);
        let previous = match rate {
            Some(rate) => state.flows.insert(key, rate),
            None => state.flows.remove(&key),
        }
        .unwrap_or(0);
        let delta = rate.unwrap_or(0) as i128 - previous as i128;
        state.account_mut(asset, sender, now).net_rate -= delta;
        state.account_mut(asset, receiver, now).net_rate += delta;
        debug!(%sender, %receiver, previous, rate = rate.unwrap_or(0), "flow written");
        Ok(())
    }
}

impl<C: Clock> Host for LocalHost<C> {
    fn address(&self) -> Address {
        self.address
    }

    fn flow_agreement(&self) -> Address {
        self.flow_agreement
    }

    fn is_context_valid(&self, ctx: &Context) -> bool {
        self.frames.lock().last() == Some(ctx)
    }

    fn flow_rate(
        &self,
        asset: Address,
        sender: Address,
        receiver: Address,
    ) -> Result<Option<FlowRate>, HostError> {
        Ok(self.state.lock().flows.get(&(asset, sender, receiver)).copied())
    }

    fn create_flow_with_context(
        &self,
        ctx: Context,
        asset: Address,
        receiver: Address,
        rate: FlowRate,
    ) -> Result<Context, HostError> {
        self.within_context(ctx, |app| {
            self.open_flow(Origin::App(app), asset, app, receiver, rate)
        })
    }

    fn update_flow_with_context(
        &self,
        ctx: Context,
        asset: Address,
        receiver: Address,
        rate: FlowRate,
    ) -> Result<Context, HostError> {
        self.within_context(ctx, |app| {
            self.change_flow(Origin::App(app), asset, app, receiver, rate)
        })
    }

    fn delete_flow_with_context(
        &self,
        ctx: Context,
        asset: Address,
        sender: Address,
        receiver: Address,
    ) -> Result<Context, HostError> {
        self.within_context(ctx, |app| {
            if app != sender && app != receiver {
                return Err(HostError::NotFlowParty { caller: app });
            }
            self.close_flow(Origin::App(app), asset, sender, receiver)
        })
    }

    fn balance_of(&self, asset: Address, account: Address) -> Result<Balance, HostError> {
        let now = self.now_secs()?;
        Ok(self
            .state
            .lock()
            .accounts
            .get(&(asset, account))
            .map(|entry| entry.balance_at(now))
            .unwrap_or(0))
    }

    fn transfer(
        &self,
        asset: Address,
        from: Address,
        to: Address,
        amount: Balance,
    ) -> Result<(), HostError> {
        if amount <= 0 {
            return Err(HostError::InvalidAmount(amount));
        }
        let now = self.now_secs()?;
        let mut state = self.state.lock();
        let source = state.account_mut(asset, from, now);
        if source.static_balance < amount {
            return Err(HostError::InsufficientBalance {
                account: from,
                available: source.static_balance,
                requested: amount,
            });
        }
        source.static_balance -= amount;
        state.account_mut(asset, to, now).static_balance += amount;
        Ok(())
    }

    fn register_app(&self, app: Address, hooks: Weak<dyn FlowApp>) -> Result<(), HostError> {
        debug!(host = %self.address, %app, "app registered");
        self.apps.insert(app, hooks);
        Ok(())
    }
}
