//! Configuration integration tests

use poloniex_trades::config::{Config, SinkLayout};
use poloniex_trades::registry::ChannelRegistry;

#[test]
fn test_config_example_parses() {
    let config = Config::parse(include_str!("../../config.toml.example")).unwrap();

    assert!(config.credentials.is_some());
    assert_eq!(config.feed.endpoint, "wss://api2.poloniex.com/");
    assert_eq!(config.sink.layout, SinkLayout::Block);

    let registry = ChannelRegistry::from_config(&config.feed);
    assert_eq!(registry, ChannelRegistry::default());
}
