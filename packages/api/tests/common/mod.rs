#![allow(dead_code)]

use std::error::Error;

use api::{BrokerConfig, demo_handlers, init_broker};
use broker::Broker;

pub type TestResult = Result<(), Box<dyn Error>>;

/// Broker over a fresh in-memory store with the demo handlers and the
/// default `default` / `high` / `low` queues.
pub async fn setup_broker() -> Result<(Broker, BrokerConfig), Box<dyn Error>> {
    let config = BrokerConfig::default();
    let broker = init_broker(&config, demo_handlers()?).await?;
    Ok((broker, config))
}
