// ===============================
// src/strategy/fixed_fair.rs
// ===============================
//
// FIXED FAIR VALUE MARKET MAKER
//    Ide: instrumen dengan fair value stabil (mis. 10000).
//    1) Take: beli semua ask < fair - edge (atau == fair - edge kalau sedang
//       short, untuk flatten); jual semua bid > fair + edge (atau == kalau long).
//    2) Rest: quote bertingkat berdasarkan posisi SETELAH take (exposure):
//       - posisi < 0          -> buy lebih agresif (best_bid + 2)
//       - posisi > soft_limit -> buy lebih pasif  (best_bid)
//       - sisa kapasitas      -> best_bid + 1
//       Sisi sell simetris. Harga buy tidak pernah > fair - edge,
//       harga sell tidak pernah < fair + edge.
//

use tracing::debug;

use super::{mismatch, rest_buy, rest_sell, take_asks, take_bids, InstrumentStrategy, Snapshot, TradeContext};
use crate::config::FixedFairConfig;
use crate::domain::TickInput;
use crate::inventory::Inventory;
use crate::ledger::Ledger;
use crate::state::{StateError, StrategyState};

pub struct FixedFairMaker {
    symbol: String,
    limit: i64,
    cfg: FixedFairConfig,
    snap: Snapshot,
}

impl FixedFairMaker {
    pub fn new(symbol: &str, limit: i64, cfg: FixedFairConfig) -> Self {
        Self { symbol: symbol.to_string(), limit, cfg, snap: Snapshot::default() }
    }
}

impl InstrumentStrategy for FixedFairMaker {
    fn symbol(&self) -> &str { &self.symbol }

    fn process(&mut self, tick: &TickInput) { self.snap = Snapshot::capture(&self.symbol, tick); }

    fn trade(&mut self, _ctx: &TradeContext, ledger: &mut Ledger) {
        let Some(book) = self.snap.book.as_ref() else { return };
        if book.is_crossed() {
            ledger.logf(format_args!("{} crossed book, skip", self.symbol));
            return;
        }

        let sym = self.symbol.as_str();
        let FixedFairConfig { fair, edge, soft_limit, max_quote } = self.cfg;
        let buy_at = fair - edge;
        let sell_at = fair + edge;
        let mut inv = Inventory::new(self.snap.position, self.limit);
        let (short, long) = (inv.is_short(), inv.is_long());

        let bought = take_asks(sym, book, &mut inv, ledger, |p| p < buy_at || (short && p == buy_at));
        let sold = take_bids(sym, book, &mut inv, ledger, |p| p > sell_at || (long && p == sell_at));

        // tier dipilih dari exposure setelah take, bukan posisi awal tick
        let exposure = inv.exposure();
        if let Some(bb) = book.best_bid() {
            if exposure < 0 {
                rest_buy(sym, &mut inv, ledger, bb.saturating_add(2).min(buy_at), max_quote);
            }
            if exposure > soft_limit {
                rest_buy(sym, &mut inv, ledger, bb.min(buy_at), max_quote);
            }
            rest_buy(sym, &mut inv, ledger, bb.saturating_add(1).min(buy_at), max_quote);
        }
        if let Some(ba) = book.best_ask() {
            if exposure > 0 {
                rest_sell(sym, &mut inv, ledger, ba.saturating_sub(2).max(sell_at), max_quote);
            }
            if exposure < -soft_limit {
                rest_sell(sym, &mut inv, ledger, ba.max(sell_at), max_quote);
            }
            rest_sell(sym, &mut inv, ledger, ba.saturating_sub(1).max(sell_at), max_quote);
        }

        debug!(symbol = %sym, position = inv.position, exposure, bought, sold, "fixed_fair traded");
        ledger.logf(format_args!("{sym} fair={fair} pos={} exp={exposure} took +{bought}/-{sold}", inv.position));
    }

    fn save(&self) -> StrategyState { StrategyState::FixedFair }

    fn restore(&mut self, state: StrategyState) -> Result<(), StateError> {
        match state {
            StrategyState::FixedFair => Ok(()),
            other => Err(mismatch(&self.symbol, &other, "fixed_fair")),
        }
    }

    fn reset(&mut self) { self.snap = Snapshot::default(); }
}
