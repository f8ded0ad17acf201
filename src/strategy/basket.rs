// ===============================
// src/strategy/basket.rs
// ===============================
//
// BASKET RELATIVE VALUE (composite + komponen, rasio integer tetap)
//    - Tiap member simpan first_mid sesi dan deviation = ln(mid / first_mid).
//    - Expected deviation = intercept + Σ hedge[other] * deviation[other],
//      dari deviation member lain hasil process() tick ini (lewat TradeContext).
//    - FairValueMode::PassThrough : fair = mid sekarang (expected hanya dilog).
//      FairValueMode::Predicted   : fair = first_mid * exp(expected).
//    - Take ask <= floor(fair), bid >= ceil(fair); rest di sekitar fair.
//

use std::collections::BTreeMap;

use tracing::debug;

use super::{mismatch, rest_buy, rest_sell, take_asks, take_bids, InstrumentStrategy, Snapshot, TradeContext};
use crate::config::{BasketGroup, BasketMemberConfig, FairValueMode};
use crate::domain::{Symbol, TickInput};
use crate::inventory::Inventory;
use crate::ledger::Ledger;
use crate::state::{StateError, StrategyState};

/// Log-return since the session's first observed mid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Deviation {
    first_mid: Option<f64>,
    current: Option<f64>,
}

impl Deviation {
    pub fn observe(&mut self, mid: f64) {
        if !(mid.is_finite() && mid > 0.0) {
            return;
        }
        let first = *self.first_mid.get_or_insert(mid);
        self.current = Some((mid / first).ln());
    }

    pub fn value(&self) -> Option<f64> { self.current }
    pub fn first_mid(&self) -> Option<f64> { self.first_mid }

    /// Price implied by a deviation, relative to this member's first mid.
    pub fn price_at(&self, deviation: f64) -> Option<f64> { self.first_mid.map(|f| f * deviation.exp()) }
}

pub struct BasketMember {
    symbol: String,
    limit: i64,
    cfg: BasketMemberConfig,
    deviation: Deviation,
    snap: Snapshot,
}

impl BasketMember {
    pub fn new(symbol: &str, limit: i64, cfg: BasketMemberConfig) -> Self {
        Self { symbol: symbol.to_string(), limit, cfg, deviation: Deviation::default(), snap: Snapshot::default() }
    }

    /// `None` if any hedge input has no deviation yet.
    pub fn expected_deviation(&self, deviations: &BTreeMap<Symbol, f64>) -> Option<f64> {
        self.cfg.hedge.iter().try_fold(self.cfg.intercept, |acc, (other, coef)| {
            deviations.get(other).map(|d| acc + coef * d)
        })
    }

    pub fn expected_price(&self, deviations: &BTreeMap<Symbol, f64>) -> Option<f64> {
        self.expected_deviation(deviations).and_then(|d| self.deviation.price_at(d))
    }

    /// Predicted mode needs no current mid once the hedge inputs are known.
    fn fair(&self, mid: Option<f64>, expected: Option<f64>) -> Option<f64> {
        match self.cfg.fair_value_mode {
            FairValueMode::PassThrough => mid,
            FairValueMode::Predicted => expected.or(mid),
        }
    }
}

impl InstrumentStrategy for BasketMember {
    fn symbol(&self) -> &str { &self.symbol }

    fn process(&mut self, tick: &TickInput) {
        self.snap = Snapshot::capture(&self.symbol, tick);
        let mid = self.snap.book.as_ref().filter(|b| !b.is_crossed()).and_then(|b| b.mid());
        if let Some(mid) = mid {
            self.deviation.observe(mid);
        }
    }

    fn trade(&mut self, ctx: &TradeContext, ledger: &mut Ledger) {
        let Some(book) = self.snap.book.as_ref() else { return };
        if book.is_crossed() {
            ledger.logf(format_args!("{} crossed book, skip", self.symbol));
            return;
        }

        let sym = self.symbol.as_str();
        let mid = book.mid();
        let expected = self.expected_price(&ctx.deviations);
        let Some(fair) = self.fair(mid, expected) else {
            ledger.logf(format_args!("{sym} no fair value, skip"));
            return;
        };
        let buy_at = fair.floor() as i64;
        let sell_at = fair.ceil() as i64;
        let mut inv = Inventory::new(self.snap.position, self.limit);

        let bought = take_asks(sym, book, &mut inv, ledger, |p| p <= buy_at);
        let sold = take_bids(sym, book, &mut inv, ledger, |p| p >= sell_at);
        // fair bulat -> buy_at == sell_at; sisi sell digeser 1 agar tidak self-cross
        let bid_quote = book.best_bid().map(|bb| bb.saturating_add(1).min(buy_at));
        let ask_quote = book
            .best_ask()
            .map(|ba| ba.saturating_sub(1).max(sell_at))
            .map(|p| match bid_quote { Some(b) if p <= b => b.saturating_add(1), _ => p });
        if let Some(px) = bid_quote {
            rest_buy(sym, &mut inv, ledger, px, self.cfg.max_quote);
        }
        if let Some(px) = ask_quote {
            rest_sell(sym, &mut inv, ledger, px, self.cfg.max_quote);
        }

        let mode = match self.cfg.fair_value_mode {
            FairValueMode::PassThrough => "pass_through",
            FairValueMode::Predicted => "predicted",
        };
        debug!(symbol = %sym, mode, ?mid, fair, ?expected, bought, sold, "basket traded");
        let mid = mid.map_or_else(|| "n/a".to_string(), |m| format!("{m:.1}"));
        let expected = expected.map_or_else(|| "n/a".to_string(), |e| format!("{e:.2}"));
        ledger.logf(format_args!(
            "{sym} mode={mode} mid={mid} expected={expected} fair={fair:.2} took +{bought}/-{sold}"
        ));
    }

    fn save(&self) -> StrategyState {
        StrategyState::Basket { first_mid: self.deviation.first_mid, deviation: self.deviation.current }
    }

    fn restore(&mut self, state: StrategyState) -> Result<(), StateError> {
        match state {
            StrategyState::Basket { first_mid, deviation } => {
                self.deviation = Deviation { first_mid, current: deviation };
                Ok(())
            }
            other => Err(mismatch(&self.symbol, &other, "basket")),
        }
    }

    fn reset(&mut self) {
        self.deviation = Deviation::default();
        self.snap = Snapshot::default();
    }

    fn deviation(&self) -> Option<f64> { self.deviation.value() }
}

/// composite mid − Σ ratio × component mid, when every member has a mid.
pub fn synthetic_spread(group: &BasketGroup, tick: &TickInput) -> Option<f64> {
    let mid = |s: &str| tick.order_depths.get(s).filter(|b| !b.is_crossed()).and_then(|b| b.mid());
    let composite = mid(&group.composite)?;
    let synthetic = group
        .components
        .iter()
        .try_fold(0.0, |acc, (s, ratio)| mid(s).map(|m| acc + *ratio as f64 * m))?;
    Some(composite - synthetic)
}
