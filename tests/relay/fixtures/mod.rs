// tests/relay/fixtures/mod.rs

pub mod forwarder;
pub mod impostor;
pub mod test_env;
