// ===============================
// src/strategy/mod.rs
// ===============================
//
// Empat keluarga strategi, satu instance per instrumen:
// 1) FixedFairMaker      -> fair value konstan + edge, quote bertingkat
// 2) PredictiveMaker     -> fair dari AR(N) predictor
// 3) ConversionArbitrage -> take vs harga konversi venue luar, flatten tiap tick
// 4) BasketMember        -> relative value basket (log deviation)
//
// Siklus per tick (dikendalikan Trader):
//   process(tick) untuk SEMUA instrumen -> trade(ctx, ledger) untuk SEMUA.
// trade() hanya boleh membaca state hasil process() yang sudah lengkap
// (lewat TradeContext), tidak pernah state parsial.
//

pub mod basket;
pub mod conversion;
pub mod fixed_fair;
pub mod predictive;

use std::collections::BTreeMap;

use crate::config::{ProductConfig, StrategyConfig};
use crate::domain::{OrderBookSnapshot, Symbol, TickInput};
use crate::inventory::Inventory;
use crate::ledger::Ledger;
use crate::state::{StateError, StrategyState};
use crate::walker::{self, Take};

pub use basket::BasketMember;
pub use conversion::ConversionArbitrage;
pub use fixed_fair::FixedFairMaker;
pub use predictive::PredictiveMaker;

/// Read-only view of the completed process pass.
#[derive(Debug, Default, Clone)]
pub struct TradeContext {
    /// Basket member -> log deviation since its first observed mid.
    pub deviations: BTreeMap<Symbol, f64>,
}

pub trait InstrumentStrategy {
    fn symbol(&self) -> &str;
    /// Update instrument-local rolling state from this tick.
    fn process(&mut self, tick: &TickInput);
    /// Emit this tick's orders (and conversion) into the ledger.
    fn trade(&mut self, ctx: &TradeContext, ledger: &mut Ledger);
    fn save(&self) -> StrategyState;
    fn restore(&mut self, state: StrategyState) -> Result<(), StateError>;
    /// Drop rolling state back to a fresh session.
    fn reset(&mut self);
    fn deviation(&self) -> Option<f64> { None }
}

pub enum Strategy {
    FixedFair(FixedFairMaker),
    Predictive(PredictiveMaker),
    Conversion(ConversionArbitrage),
    Basket(BasketMember),
}

impl Strategy {
    pub fn from_config(symbol: &str, cfg: &ProductConfig) -> Self {
        match &cfg.strategy {
            StrategyConfig::FixedFair(c) => Strategy::FixedFair(FixedFairMaker::new(symbol, cfg.limit, c.clone())),
            StrategyConfig::Predictive(c) => Strategy::Predictive(PredictiveMaker::new(symbol, cfg.limit, c.clone())),
            StrategyConfig::Conversion(c) => Strategy::Conversion(ConversionArbitrage::new(symbol, cfg.limit, c.clone())),
            StrategyConfig::Basket(c) => Strategy::Basket(BasketMember::new(symbol, cfg.limit, c.clone())),
        }
    }

    fn inner(&self) -> &dyn InstrumentStrategy {
        match self {
            Strategy::FixedFair(s) => s,
            Strategy::Predictive(s) => s,
            Strategy::Conversion(s) => s,
            Strategy::Basket(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn InstrumentStrategy {
        match self {
            Strategy::FixedFair(s) => s,
            Strategy::Predictive(s) => s,
            Strategy::Conversion(s) => s,
            Strategy::Basket(s) => s,
        }
    }
}

impl InstrumentStrategy for Strategy {
    fn symbol(&self) -> &str { self.inner().symbol() }
    fn process(&mut self, tick: &TickInput) { self.inner_mut().process(tick) }
    fn trade(&mut self, ctx: &TradeContext, ledger: &mut Ledger) { self.inner_mut().trade(ctx, ledger) }
    fn save(&self) -> StrategyState { self.inner().save() }
    fn restore(&mut self, state: StrategyState) -> Result<(), StateError> { self.inner_mut().restore(state) }
    fn reset(&mut self) { self.inner_mut().reset() }
    fn deviation(&self) -> Option<f64> { self.inner().deviation() }
}

/// Per-tick inputs every strategy caches in `process`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    pub book: Option<OrderBookSnapshot>,
    pub position: i64,
}

impl Snapshot {
    pub fn capture(symbol: &str, tick: &TickInput) -> Self {
        Self { book: tick.order_depths.get(symbol).cloned(), position: tick.position_of(symbol) }
    }
}

pub(crate) fn mismatch(symbol: &str, found: &StrategyState, expected: &'static str) -> StateError {
    StateError::KindMismatch { symbol: symbol.to_string(), found: found.label(), expected }
}

// -----------------------------------------------------------------------------
// Shared take / rest helpers
// -----------------------------------------------------------------------------

fn emit(symbol: &str, takes: &[Take], sign: i64, ledger: &mut Ledger) -> i64 {
    for t in takes {
        ledger.create_order(symbol, t.price, sign * t.qty);
    }
    walker::total(takes)
}

/// Lift asks for which `favorable` holds, up to remaining buy capacity.
pub(crate) fn take_asks<F: FnMut(i64) -> bool>(
    symbol: &str,
    book: &OrderBookSnapshot,
    inv: &mut Inventory,
    ledger: &mut Ledger,
    favorable: F,
) -> i64 {
    let takes = walker::walk(book.asks_asc(), favorable, inv.buy_capacity());
    let qty = emit(symbol, &takes, 1, ledger);
    inv.record_buy(qty);
    qty
}

/// Hit bids for which `favorable` holds, up to remaining sell capacity.
pub(crate) fn take_bids<F: FnMut(i64) -> bool>(
    symbol: &str,
    book: &OrderBookSnapshot,
    inv: &mut Inventory,
    ledger: &mut Ledger,
    favorable: F,
) -> i64 {
    let takes = walker::walk(book.bids_desc(), favorable, inv.sell_capacity());
    let qty = emit(symbol, &takes, -1, ledger);
    inv.record_sell(qty);
    qty
}

pub(crate) fn rest_buy(symbol: &str, inv: &mut Inventory, ledger: &mut Ledger, price: i64, max_qty: i64) -> i64 {
    let qty = inv.buy_capacity().min(max_qty.max(0));
    if qty > 0 {
        ledger.create_order(symbol, price, qty);
        inv.record_buy(qty);
    }
    qty
}

pub(crate) fn rest_sell(symbol: &str, inv: &mut Inventory, ledger: &mut Ledger, price: i64, max_qty: i64) -> i64 {
    let qty = inv.sell_capacity().min(max_qty.max(0));
    if qty > 0 {
        ledger.create_order(symbol, price, -qty);
        inv.record_sell(qty);
    }
    qty
}

#[cfg(test)]
pub(crate) mod testkit {
    use crate::domain::{OrderBookSnapshot, TickInput};

    pub fn tick(symbol: &str, book: OrderBookSnapshot, position: i64) -> TickInput {
        let mut t = TickInput::default();
        t.order_depths.insert(symbol.to_string(), book);
        t.position.insert(symbol.to_string(), position);
        t
    }
}
