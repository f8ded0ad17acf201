// ===============================
// src/positions.rs (PnL & Inventory tracker, harness only)
// ===============================
//
// Diagnostik saja, tidak pernah dibaca engine:
// - own_trades tiap tick -> qty, avg cost, realized PnL per simbol
// - mid tiap tick        -> unrealized PnL (mark-to-market)
// own_trades = fill sejak tick sebelumnya (kontrak harness), jadi tidak di-dedupe.
//

use ahash::AHashMap as HashMap;
use tokio::sync::mpsc;
use tracing::info;

use crate::domain::{Side, Symbol, TickInput, Trade};
use crate::metrics::{INV_QTY, PNL_REALIZED, PNL_UNREALIZED};

/// Counterparty name the venue uses for our own fills.
pub const OWN_ID: &str = "SUBMISSION";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolPnl {
    pub qty: i64,
    pub avg_cost: f64,
    pub realized: f64,
    pub unrealized: f64,
    pub last_mid: Option<f64>,
}

impl SymbolPnl {
    fn on_fill(&mut self, side: Side, qty: i64, price: f64) {
        let signed = side.sign() * qty;
        let prev = self.qty;
        if prev == 0 || prev.signum() == signed.signum() {
            // arah sama -> update avg cost
            let held = prev.abs() as f64;
            self.avg_cost = (self.avg_cost * held + price * qty as f64) / (held + qty as f64);
            self.qty = prev + signed;
            return;
        }
        // arah berlawanan -> realize sebagian/semua, sisanya buka posisi baru
        let closed = qty.min(prev.abs());
        self.realized += (price - self.avg_cost) * (prev.signum() * closed) as f64;
        self.qty = prev + signed;
        if self.qty == 0 {
            self.avg_cost = 0.0;
        } else if self.qty.signum() != prev.signum() {
            self.avg_cost = price;
        }
    }

    fn mark(&mut self, mid: f64) {
        self.last_mid = Some(mid);
        self.unrealized = if self.qty == 0 { 0.0 } else { (mid - self.avg_cost) * self.qty as f64 };
    }
}

#[derive(Debug, Default)]
pub struct PnlTracker {
    by_symbol: HashMap<Symbol, SymbolPnl>,
}

impl PnlTracker {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, symbol: &str) -> Option<&SymbolPnl> { self.by_symbol.get(symbol) }

    pub fn apply_trade(&mut self, trade: &Trade) {
        let side = if trade.buyer == OWN_ID {
            Side::Buy
        } else if trade.seller == OWN_ID {
            Side::Sell
        } else {
            return;
        };
        let qty = trade.quantity.saturating_abs();
        if qty == 0 {
            return;
        }
        self.by_symbol.entry(trade.symbol.clone()).or_default().on_fill(side, qty, trade.price as f64);
    }

    pub fn on_tick(&mut self, tick: &TickInput) {
        for trades in tick.own_trades.values() {
            for t in trades {
                self.apply_trade(t);
            }
        }
        for (sym, book) in &tick.order_depths {
            if let Some(mid) = book.mid() {
                self.by_symbol.entry(sym.clone()).or_default().mark(mid);
            }
        }
        self.publish();
    }

    pub fn total_realized(&self) -> f64 { self.by_symbol.values().map(|p| p.realized).sum() }
    pub fn total_unrealized(&self) -> f64 { self.by_symbol.values().map(|p| p.unrealized).sum() }

    fn publish(&self) {
        for (sym, p) in &self.by_symbol {
            INV_QTY.with_label_values(&[sym.as_str()]).set(p.qty);
            PNL_REALIZED.with_label_values(&[sym.as_str()]).set(p.realized.round() as i64);
            PNL_UNREALIZED.with_label_values(&[sym.as_str()]).set(p.unrealized.round() as i64);
        }
    }
}

/// Consume ticks until the channel closes; returns the final tracker.
pub async fn run(mut rx: mpsc::Receiver<TickInput>) -> PnlTracker {
    let mut tracker = PnlTracker::new();
    while let Some(tick) = rx.recv().await {
        tracker.on_tick(&tick);
    }
    info!(
        realized = tracker.total_realized(),
        unrealized = tracker.total_unrealized(),
        "positions: session closed"
    );
    tracker
}
