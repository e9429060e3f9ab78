// tests/relay/fixtures/test_env.rs

// a local host with a factory and funded senders, ready for relay scenarios

// dependencies
use super::forwarder::Forwarder;
use super::impostor::Impostor;
use super::locker::Locker;
use super::test_clock::TestClock;
use flow_relay::{
    Address, FlowApp, FlowRate, FlowRelay, Host, LocalHost, LocalHostConfig, RelayConfig,
    RelayFactory,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

pub const MIN_FLOW_RATE: FlowRate = 1000;

pub const HOST: u64 = 0x01;
pub const FLOW_AGREEMENT: u64 = 0x02;
pub const FACTORY: u64 = 0x03;
pub const OWNER: u64 = 0x10;
pub const ASSET: u64 = 0x11;

pub type TestRelay = FlowRelay<LocalHost<TestClock>>;

pub struct TestEnv {
    pub clock: TestClock,
    pub host: Arc<LocalHost<TestClock>>,
    pub factory: RelayFactory<LocalHost<TestClock>>,
    pub asset: Address,
    pub owner: Address,
    pub senders: Vec<Address>,
    next_account: AtomicU64,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_granularity(1)
    }

    pub fn with_granularity(granularity: FlowRate) -> Self {
        let clock = TestClock::new(1_000.0);
        let config = LocalHostConfig::new(
            Address::from_low_u64(HOST),
            Address::from_low_u64(FLOW_AGREEMENT),
        )
        .granularity(granularity);
        let host = Arc::new(LocalHost::with_config(config, clock.clone()).unwrap());
        let owner = Address::from_low_u64(OWNER);
        let factory = RelayFactory::new(Address::from_low_u64(FACTORY), owner, Arc::clone(&host));
        let asset = Address::from_low_u64(ASSET);

        let senders: Vec<Address> = (0x20..0x25).map(Address::from_low_u64).collect();
        for sender in &senders {
            host.mint(asset, *sender, 1_000_000_000_000_000_000_000_000)
                .unwrap();
        }

        Self {
            clock,
            host,
            factory,
            asset,
            owner,
            senders,
            next_account: AtomicU64::new(0x100),
        }
    }

    pub fn host_address(&self) -> Address {
        Address::from_low_u64(HOST)
    }

    pub fn fresh_account(&self) -> Address {
        Address::from_low_u64(self.next_account.fetch_add(1, Ordering::Relaxed))
    }

    /// A recipient app registered with the host for callbacks.
    pub fn locker(&self) -> (Address, Arc<Locker>) {
        let address = self.fresh_account();
        let locker = Arc::new(Locker::new());
        let hooks: Weak<dyn FlowApp> = Arc::downgrade(&locker) as Weak<dyn FlowApp>;
        self.host.register_app(address, hooks).unwrap();
        (address, locker)
    }

    /// An app that forwards each incoming flow to `target` at `rate`.
    pub fn forwarder(&self, target: Address, rate: FlowRate) -> (Address, Arc<Forwarder>) {
        let address = self.fresh_account();
        let forwarder = Arc::new(Forwarder::new(Arc::clone(&self.host), self.asset, target, rate));
        let hooks: Weak<dyn FlowApp> = Arc::downgrade(&forwarder) as Weak<dyn FlowApp>;
        self.host.register_app(address, hooks).unwrap();
        (address, forwarder)
    }

    /// A recipient app that fakes closes of `victim`'s flow.
    pub fn impostor(&self, victim: Address) -> (Address, Arc<Impostor>) {
        let address = self.fresh_account();
        let impostor = Arc::new(Impostor::new(victim));
        let hooks: Weak<dyn FlowApp> = Arc::downgrade(&impostor) as Weak<dyn FlowApp>;
        self.host.register_app(address, hooks).unwrap();
        (address, impostor)
    }

    pub fn config(&self, recipient: Address, min_flow_rate: FlowRate) -> RelayConfig {
        RelayConfig::new(self.host_address(), self.asset, recipient, min_flow_rate)
    }

    pub fn deploy(&self, recipient: Address, min_flow_rate: FlowRate) -> Arc<TestRelay> {
        self.factory
            .deploy(self.owner, self.config(recipient, min_flow_rate))
            .unwrap()
    }

    /// Rate the host settles for the relay's outbound flow; zero when closed.
    pub fn outbound(&self, relay: &TestRelay, recipient: Address) -> FlowRate {
        self.host
            .flow_rate(self.asset, relay.address(), recipient)
            .unwrap()
            .unwrap_or(0)
    }

    pub fn inbound(&self, sender: Address, relay: &TestRelay) -> Option<FlowRate> {
        self.host
            .flow_rate(self.asset, sender, relay.address())
            .unwrap()
    }

    pub fn create(&self, sender: Address, relay: &TestRelay, rate: FlowRate) {
        self.host
            .create_flow(sender, self.asset, relay.address(), rate)
            .unwrap();
    }

    pub fn update(&self, sender: Address, relay: &TestRelay, rate: FlowRate) {
        self.host
            .update_flow(sender, self.asset, relay.address(), rate)
            .unwrap();
    }

    pub fn delete(&self, sender: Address, relay: &TestRelay) {
        self.host
            .delete_flow(sender, self.asset, sender, relay.address())
            .unwrap();
    }
}
