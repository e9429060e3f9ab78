// tests/relay/factory_tests.rs

#[cfg(test)]
mod tests {
    use crate::fixtures::test_env::{MIN_FLOW_RATE, TestEnv};
    use flow_relay::{Address, RelayError};

    #[test]
    fn deploy_rejects_incomplete_configuration() {
        let env = TestEnv::new();
        let recipient = env.fresh_account();

        let config = env.config(recipient, MIN_FLOW_RATE).host(Address::ZERO);
        assert!(matches!(
            env.factory.deploy(env.owner, config),
            Err(RelayError::HostRequired)
        ));

        let config = env.config(recipient, MIN_FLOW_RATE).asset(Address::ZERO);
        assert!(matches!(
            env.factory.deploy(env.owner, config),
            Err(RelayError::AssetRequired)
        ));

        let config = env.config(Address::ZERO, MIN_FLOW_RATE);
        assert!(matches!(
            env.factory.deploy(env.owner, config),
            Err(RelayError::RecipientRequired)
        ));

        let config = env.config(recipient, 0);
        assert!(matches!(
            env.factory.deploy(env.owner, config),
            Err(RelayError::LowFlowRate { .. })
        ));

        assert!(env.factory.deployments().is_empty());
        assert!(env.factory.deploy(env.owner, env.config(recipient, MIN_FLOW_RATE)).is_ok());
    }

    #[test]
    fn deploy_is_owner_gated() {
        let env = TestEnv::new();
        let recipient = env.fresh_account();
        let intruder = env.senders[1];
        let result = env.factory.deploy(intruder, env.config(recipient, MIN_FLOW_RATE));
        assert!(matches!(
            result,
            Err(RelayError::NotOwner { caller }) if caller == intruder
        ));
        assert!(env.factory.deployments().is_empty());
    }

    #[test]
    fn reinitialize_fails_unconditionally() {
        let env = TestEnv::new();
        let recipient = env.fresh_account();
        let relay = env.deploy(recipient, MIN_FLOW_RATE);

        assert!(matches!(
            relay.initialize(env.config(recipient, MIN_FLOW_RATE)),
            Err(RelayError::AlreadyInitialized)
        ));
        // even with a broken config the answer is the same
        assert!(matches!(
            relay.initialize(env.config(Address::ZERO, 0)),
            Err(RelayError::AlreadyInitialized)
        ));
        assert_eq!(relay.config(), Some(&env.config(recipient, MIN_FLOW_RATE)));
    }

    #[test]
    fn deployments_are_recorded_with_distinct_addresses() {
        let env = TestEnv::new();
        let first_recipient = env.fresh_account();
        let second_recipient = env.fresh_account();
        let first = env.deploy(first_recipient, MIN_FLOW_RATE);
        let second = env.deploy(second_recipient, 1);

        assert_ne!(first.address(), second.address());
        let deployments = env.factory.deployments();
        assert_eq!(deployments.len(), 2);
        assert_eq!(deployments[0].relay, first.address());
        assert_eq!(deployments[0].config, env.config(first_recipient, MIN_FLOW_RATE));
        assert_eq!(deployments[1].relay, second.address());
        assert_eq!(deployments[1].config.minimum_rate(), 1);
    }

    #[test]
    fn deployed_relay_receives_host_callbacks() {
        let env = TestEnv::new();
        let recipient = env.fresh_account();
        let relay = env.deploy(recipient, MIN_FLOW_RATE);
        env.create(env.senders[0], &relay, 2_500);
        assert_eq!(relay.ledger_total(), 2_500);
        assert_eq!(env.outbound(&relay, recipient), 2_500);
    }
}
