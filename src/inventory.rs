// ===============================
// src/inventory.rs
// ===============================
//
// Pembukuan kapasitas per tick: posisi awal tick + semua qty yang sudah
// dikirim (take maupun resting). Kapasitas dihitung worst case (semua order
// dianggap terisi), jadi set order satu tick tidak pernah bisa menembus limit.
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inventory {
    pub position: i64,
    pub limit: i64,
    bought: i64,
    sold: i64,
}

impl Inventory {
    pub fn new(position: i64, limit: i64) -> Self {
        Self { position, limit: limit.max(0), bought: 0, sold: 0 }
    }

    pub fn buy_capacity(&self) -> i64 { (self.limit - self.position - self.bought).max(0) }
    pub fn sell_capacity(&self) -> i64 { (self.limit + self.position - self.sold).max(0) }

    pub fn record_buy(&mut self, qty: i64) { self.bought += qty.max(0); }
    pub fn record_sell(&mut self, qty: i64) { self.sold += qty.max(0); }

    /// Position if every order recorded so far fills.
    pub fn exposure(&self) -> i64 { self.position + self.bought - self.sold }

    pub fn is_short(&self) -> bool { self.position < 0 }
    pub fn is_long(&self) -> bool { self.position > 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_shrinks_as_orders_are_recorded() {
        let mut inv = Inventory::new(5, 20);
        assert_eq!(inv.buy_capacity(), 15);
        assert_eq!(inv.sell_capacity(), 25);
        inv.record_buy(10);
        inv.record_sell(25);
        assert_eq!(inv.buy_capacity(), 5);
        assert_eq!(inv.sell_capacity(), 0);
        assert_eq!(inv.exposure(), -10);
    }

    #[test]
    fn out_of_range_position_clamps_to_zero() {
        let inv = Inventory::new(-30, 20);
        assert_eq!(inv.sell_capacity(), 0);
        assert_eq!(inv.buy_capacity(), 50);
    }
}
