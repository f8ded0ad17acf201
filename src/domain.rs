// ===============================
// src/domain.rs
// ===============================
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type Symbol = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side { Buy, Sell }
impl Side { pub fn sign(&self) -> i64 { match self { Side::Buy => 1, Side::Sell => -1 } } }

/// Order keluar dari engine. `qty > 0` beli, `qty < 0` jual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order { pub symbol: Symbol, pub price: i64, pub qty: i64 }

impl Order {
    pub fn new(symbol: &str, price: i64, qty: i64) -> Self {
        Self { symbol: symbol.to_string(), price, qty }
    }
    pub fn side(&self) -> Side { if self.qty >= 0 { Side::Buy } else { Side::Sell } }
}

/// Two price ladders for one instrument at one tick.
///
/// Sell-side volumes may arrive negative (some feeds sign them); every
/// accessor below yields absolute volumes and skips empty levels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    #[serde(default)]
    pub bids: BTreeMap<i64, i64>,
    #[serde(default)]
    pub asks: BTreeMap<i64, i64>,
}

impl OrderBookSnapshot {
    pub fn new(bids: &[(i64, i64)], asks: &[(i64, i64)]) -> Self {
        Self {
            bids: bids.iter().copied().collect(),
            asks: asks.iter().copied().collect(),
        }
    }

    /// Bids in priority order: highest price first.
    pub fn bids_desc(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.bids.iter().rev().map(|(&p, &v)| (p, v.saturating_abs())).filter(|&(_, v)| v > 0)
    }

    /// Asks in priority order: lowest price first.
    pub fn asks_asc(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.asks.iter().map(|(&p, &v)| (p, v.saturating_abs())).filter(|&(_, v)| v > 0)
    }

    pub fn best_bid(&self) -> Option<i64> { self.bids_desc().next().map(|(p, _)| p) }
    pub fn best_ask(&self) -> Option<i64> { self.asks_asc().next().map(|(p, _)| p) }

    pub fn mid(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => Some((b as f64 + a as f64) / 2.0),
            _ => None,
        }
    }

    /// best_bid >= best_ask: snapshot tidak valid untuk trading.
    pub fn is_crossed(&self) -> bool {
        matches!((self.best_bid(), self.best_ask()), (Some(b), Some(a)) if b >= a)
    }
}

/// External-venue quote for a convertible instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionObservation {
    pub bid_price: f64,
    pub ask_price: f64,
    pub transport_fees: f64,
    pub export_tariff: f64,
    pub import_tariff: f64,
    #[serde(default)]
    pub sunlight: f64,
    #[serde(default)]
    pub humidity: f64,
}

impl ConversionObservation {
    /// Cost of buying on the external venue and importing.
    pub fn adjusted_ask(&self) -> f64 { self.ask_price + self.import_tariff + self.transport_fees }
    /// Proceeds of exporting and selling on the external venue.
    pub fn adjusted_bid(&self) -> f64 { self.bid_price - self.export_tariff - self.transport_fees }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observations {
    #[serde(default)]
    pub conversion: BTreeMap<Symbol, ConversionObservation>,
    #[serde(default)]
    pub plain: BTreeMap<Symbol, i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: Symbol,
    pub price: i64,
    pub quantity: i64,
    #[serde(default)]
    pub buyer: String,
    #[serde(default)]
    pub seller: String,
    pub timestamp: i64,
}

/// Everything the harness hands the engine for one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    pub timestamp: i64,
    #[serde(default)]
    pub trader_data: String,
    #[serde(default)]
    pub order_depths: BTreeMap<Symbol, OrderBookSnapshot>,
    #[serde(default)]
    pub position: BTreeMap<Symbol, i64>,
    #[serde(default)]
    pub observations: Observations,
    #[serde(default)]
    pub own_trades: BTreeMap<Symbol, Vec<Trade>>,
    #[serde(default)]
    pub market_trades: BTreeMap<Symbol, Vec<Trade>>,
}

impl TickInput {
    pub fn position_of(&self, symbol: &str) -> i64 { self.position.get(symbol).copied().unwrap_or(0) }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickOutput {
    pub orders: BTreeMap<Symbol, Vec<Order>>,
    pub conversions: i64,
    pub trader_data: String,
    pub logs: String,
}

// Recorder events (harness)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision { pub timestamp: i64, pub recorded_at: String, pub latency_us: u64, pub output: TickOutput }
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event { Decision(Decision), Note(String) }
