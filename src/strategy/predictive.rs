// ===============================
// src/strategy/predictive.rs
// ===============================
//
// PREDICTIVE MARKET MAKER
//    Ide: fair = forecast AR(N) dari N mid terakhir.
//    Band diterima [lo, hi] = [floor(f) - 1, ceil(f) + 1].
//    - Take: ask <= lo (atau lo + 1 kalau short), bid >= hi (atau hi - 1 kalau long).
//    - Rest: buy min(best_bid + 1, lo), sell max(best_ask - 1, hi), sisa kapasitas.
//    Predictor hanya fungsi dari window mid + koefisien statis.
//

use tracing::debug;

use super::{mismatch, rest_buy, rest_sell, take_asks, take_bids, InstrumentStrategy, Snapshot, TradeContext};
use crate::config::PredictiveConfig;
use crate::domain::TickInput;
use crate::inventory::Inventory;
use crate::ledger::Ledger;
use crate::predictor::Predictor;
use crate::state::{StateError, StrategyState};

pub struct PredictiveMaker {
    symbol: String,
    limit: i64,
    predictor: Predictor,
    snap: Snapshot,
}

impl PredictiveMaker {
    pub fn new(symbol: &str, limit: i64, cfg: PredictiveConfig) -> Self {
        Self {
            symbol: symbol.to_string(),
            limit,
            predictor: Predictor::new(cfg.coefficients, cfg.intercept),
            snap: Snapshot::default(),
        }
    }

    pub fn predictor(&self) -> &Predictor { &self.predictor }
}

impl InstrumentStrategy for PredictiveMaker {
    fn symbol(&self) -> &str { &self.symbol }

    fn process(&mut self, tick: &TickInput) {
        self.snap = Snapshot::capture(&self.symbol, tick);
        let mid = self.snap.book.as_ref().filter(|b| !b.is_crossed()).and_then(|b| b.mid());
        if let Some(mid) = mid {
            self.predictor.observe(mid);
        }
    }

    fn trade(&mut self, _ctx: &TradeContext, ledger: &mut Ledger) {
        let Some(book) = self.snap.book.as_ref() else { return };
        if book.is_crossed() {
            ledger.logf(format_args!("{} crossed book, skip", self.symbol));
            return;
        }
        let Some((lo, hi)) = self.predictor.band() else { return };

        let sym = self.symbol.as_str();
        let mut inv = Inventory::new(self.snap.position, self.limit);
        let (short, long) = (inv.is_short(), inv.is_long());

        let bought = take_asks(sym, book, &mut inv, ledger, |p| p <= lo || (short && p == lo + 1));
        let sold = take_bids(sym, book, &mut inv, ledger, |p| p >= hi || (long && p == hi - 1));

        if let Some(bb) = book.best_bid() {
            rest_buy(sym, &mut inv, ledger, bb.saturating_add(1).min(lo), self.limit * 2);
        }
        if let Some(ba) = book.best_ask() {
            rest_sell(sym, &mut inv, ledger, ba.saturating_sub(1).max(hi), self.limit * 2);
        }

        let forecast = self.predictor.forecast().unwrap_or_default();
        debug!(symbol = %sym, forecast, lo, hi, bought, sold, "predictive traded");
        ledger.logf(format_args!("{sym} forecast={forecast:.2} band=[{lo},{hi}] took +{bought}/-{sold}"));
    }

    fn save(&self) -> StrategyState { StrategyState::Predictive { window: self.predictor.window().clone() } }

    fn restore(&mut self, state: StrategyState) -> Result<(), StateError> {
        match state {
            StrategyState::Predictive { window } => {
                self.predictor.restore_window(window);
                Ok(())
            }
            other => Err(mismatch(&self.symbol, &other, "predictive")),
        }
    }

    fn reset(&mut self) {
        self.predictor.reset();
        self.snap = Snapshot::default();
    }
}
