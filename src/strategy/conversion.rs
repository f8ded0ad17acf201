// ===============================
// src/strategy/conversion.rs
// ===============================
//
// CROSS-VENUE CONVERSION ARBITRAGE
//    Ide: bandingkan book lokal dengan harga konversi venue luar
//    (setelah tarif & ongkos kirim).
//    - Beli ask lokal < adjusted conversion bid (nanti dibuang via konversi).
//    - Jual bid lokal > adjusted conversion ask.
//    - Tidak ada resting quote.
//    - Akhir tick: SELALU minta konversi = -posisi, inventory lokal di-flatten.
//
//    Storage fee: ada di config tapi default tidak dipakai (lihat
//    `apply_storage_fee`). Posisi memang selalu di-flatten tiap tick.
//

use tracing::debug;

use super::{mismatch, take_asks, take_bids, InstrumentStrategy, Snapshot, TradeContext};
use crate::config::ConversionConfig;
use crate::domain::{ConversionObservation, TickInput};
use crate::inventory::Inventory;
use crate::ledger::Ledger;
use crate::state::{StateError, StrategyState};

pub struct ConversionArbitrage {
    symbol: String,
    limit: i64,
    cfg: ConversionConfig,
    last_observation: Option<ConversionObservation>,
    snap: Snapshot,
}

impl ConversionArbitrage {
    pub fn new(symbol: &str, limit: i64, cfg: ConversionConfig) -> Self {
        Self { symbol: symbol.to_string(), limit, cfg, last_observation: None, snap: Snapshot::default() }
    }

    /// (adjusted bid, adjusted ask) of the external venue, if any observation was seen.
    pub fn conversion_prices(&self) -> Option<(f64, f64)> {
        self.last_observation.as_ref().map(|o| {
            let fee = if self.cfg.apply_storage_fee { self.cfg.storage_fee } else { 0.0 };
            (o.adjusted_bid() - fee, o.adjusted_ask())
        })
    }
}

impl InstrumentStrategy for ConversionArbitrage {
    fn symbol(&self) -> &str { &self.symbol }

    fn process(&mut self, tick: &TickInput) {
        self.snap = Snapshot::capture(&self.symbol, tick);
        if let Some(obs) = tick.observations.conversion.get(&self.symbol) {
            self.last_observation = Some(obs.clone());
        }
    }

    fn trade(&mut self, _ctx: &TradeContext, ledger: &mut Ledger) {
        let sym = self.symbol.as_str();
        let mut inv = Inventory::new(self.snap.position, self.limit);

        let book = self.snap.book.as_ref().filter(|b| !b.is_crossed());
        if let (Some(book), Some((conv_bid, conv_ask))) = (book, self.conversion_prices()) {
            let bought = take_asks(sym, book, &mut inv, ledger, |p| (p as f64) < conv_bid);
            let sold = take_bids(sym, book, &mut inv, ledger, |p| (p as f64) > conv_ask);
            debug!(symbol = %sym, conv_bid, conv_ask, bought, sold, "conversion arb traded");
            ledger.logf(format_args!(
                "{sym} conv_bid={conv_bid:.2} conv_ask={conv_ask:.2} took +{bought}/-{sold}"
            ));
        }

        let conversion = -self.snap.position;
        ledger.create_conversion(conversion);
        ledger.logf(format_args!("{sym} pos={} conversion={conversion}", self.snap.position));
    }

    fn save(&self) -> StrategyState {
        StrategyState::Conversion { last_observation: self.last_observation.clone() }
    }

    fn restore(&mut self, state: StrategyState) -> Result<(), StateError> {
        match state {
            StrategyState::Conversion { last_observation } => {
                self.last_observation = last_observation;
                Ok(())
            }
            other => Err(mismatch(&self.symbol, &other, "conversion")),
        }
    }

    fn reset(&mut self) {
        self.last_observation = None;
        self.snap = Snapshot::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Order, OrderBookSnapshot};
    use crate::strategy::testkit::tick;

    fn obs(bid: f64, ask: f64) -> ConversionObservation {
        ConversionObservation {
            bid_price: bid,
            ask_price: ask,
            transport_fees: 1.0,
            export_tariff: 1.0,
            import_tariff: -2.0,
            sunlight: 2500.0,
            humidity: 70.0,
        }
    }

    fn run(a: &mut ConversionArbitrage, book: OrderBookSnapshot, position: i64, o: Option<ConversionObservation>) -> (Vec<Order>, i64) {
        let mut t = tick("ORCHIDS", book, position);
        if let Some(o) = o {
            t.observations.conversion.insert("ORCHIDS".to_string(), o);
        }
        let mut ledger = Ledger::new();
        a.process(&t);
        a.trade(&TradeContext::default(), &mut ledger);
        let mut d = ledger.drain();
        (d.orders.remove("ORCHIDS").unwrap_or_default(), d.conversion)
    }

    #[test]
    fn buys_below_adjusted_bid_and_sells_above_adjusted_ask() {
        let mut a = ConversionArbitrage::new("ORCHIDS", 100, ConversionConfig::default());
        // adjusted bid = 1100 - 1 - 1 = 1098, adjusted ask = 1102 - 2 + 1 = 1101
        let book = OrderBookSnapshot::new(&[(1096, 10)], &[(1097, 30), (1098, 30)]);
        let (orders, conv) = run(&mut a, book, 0, Some(obs(1100.0, 1102.0)));
        assert_eq!(orders, vec![Order::new("ORCHIDS", 1097, 30)]);
        assert_eq!(conv, 0);

        let book = OrderBookSnapshot::new(&[(1103, 80), (1102, 40)], &[(1110, 5)]);
        let (orders, conv) = run(&mut a, book, 30, Some(obs(1100.0, 1102.0)));
        // sell capacity = 100 + 30
        assert_eq!(orders, vec![Order::new("ORCHIDS", 1103, -80), Order::new("ORCHIDS", 1102, -40)]);
        assert_eq!(conv, -30);
    }

    #[test]
    fn conversion_always_flattens_even_without_book() {
        let mut a = ConversionArbitrage::new("ORCHIDS", 100, ConversionConfig::default());
        let (orders, conv) = run(&mut a, OrderBookSnapshot::default(), -42, None);
        assert!(orders.is_empty());
        assert_eq!(conv, 42);
    }

    #[test]
    fn cached_observation_is_reused_and_persisted() {
        let mut a = ConversionArbitrage::new("ORCHIDS", 100, ConversionConfig::default());
        run(&mut a, OrderBookSnapshot::default(), 0, Some(obs(1100.0, 1102.0)));
        let mut b = ConversionArbitrage::new("ORCHIDS", 100, ConversionConfig::default());
        b.restore(a.save()).unwrap();
        let (orders, _) = run(&mut b, OrderBookSnapshot::new(&[], &[(1090, 5)]), 0, None);
        assert_eq!(orders, vec![Order::new("ORCHIDS", 1090, 5)]);
    }

    #[test]
    fn storage_fee_only_applies_when_enabled() {
        let mut off = ConversionArbitrage::new("ORCHIDS", 100, ConversionConfig::default());
        let mut on = ConversionArbitrage::new(
            "ORCHIDS",
            100,
            ConversionConfig { storage_fee: 0.5, apply_storage_fee: true },
        );
        // bid 1099.4 -> adjusted 1097.4 would lift 1097; the fee pushes it to 1096.9
        let book = || OrderBookSnapshot::new(&[], &[(1097, 10)]);
        assert_eq!(run(&mut off, book(), 0, Some(obs(1100.0, 1102.0))).0.len(), 1);
        assert_eq!(run(&mut on, book(), 0, Some(obs(1099.4, 1102.0))).0.len(), 0);
    }
}
