// ===============================
// src/lib.rs
// ===============================
//
// Decision engine (sinkron, tanpa I/O):
//   domain, walker, predictor, inventory, ledger, strategy, risk, state, trader
// Ambient:
//   config, metrics
// Harness (async, dipakai main.rs):
//   feed, recorder, positions
//
pub mod config;
pub mod domain;
pub mod feed;
pub mod inventory;
pub mod ledger;
pub mod metrics;
pub mod positions;
pub mod predictor;
pub mod recorder;
pub mod risk;
pub mod state;
pub mod strategy;
pub mod trader;
pub mod walker;

pub use config::EngineConfig;
pub use domain::{Order, OrderBookSnapshot, TickInput, TickOutput};
pub use trader::Trader;
