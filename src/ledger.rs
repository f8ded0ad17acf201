// ===============================
// src/ledger.rs
// ===============================
//
// Order ledger untuk satu tick:
// - create_order     : append, tanpa validasi (limit = tanggung jawab strategi)
// - create_conversion: overwrite, last write wins (bukan akumulasi)
// - drain            : kembalikan semua isi lalu kosongkan
//
// Ledger juga menampung teks diagnostik yang dikembalikan ke harness.
//

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::domain::{Order, Symbol};

#[derive(Debug, Default)]
pub struct Ledger {
    orders: BTreeMap<Symbol, Vec<Order>>,
    conversion: Option<i64>,
    logs: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Drained {
    pub orders: BTreeMap<Symbol, Vec<Order>>,
    pub conversion: i64,
    pub logs: String,
}

impl Ledger {
    pub fn new() -> Self { Self::default() }

    pub fn create_order(&mut self, symbol: &str, price: i64, qty: i64) {
        if qty == 0 {
            return;
        }
        self.orders.entry(symbol.to_string()).or_default().push(Order::new(symbol, price, qty));
    }

    pub fn create_conversion(&mut self, qty: i64) { self.conversion = Some(qty); }

    pub fn orders_for(&self, symbol: &str) -> &[Order] {
        self.orders.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Buang semua order satu simbol (dipakai risk guard).
    pub fn discard(&mut self, symbol: &str) -> Vec<Order> { self.orders.remove(symbol).unwrap_or_default() }

    pub fn logf(&mut self, args: std::fmt::Arguments<'_>) {
        let _ = self.logs.write_fmt(args);
        self.logs.push('\n');
    }

    pub fn drain(&mut self) -> Drained {
        Drained {
            orders: std::mem::take(&mut self.orders),
            conversion: self.conversion.take().unwrap_or(0),
            logs: std::mem::take(&mut self.logs),
        }
    }
}
