// ===============================
// src/risk.rs
// ===============================
//
// Guard terakhir sebelum order keluar: worst case semua order satu simbol
// terisi tidak boleh menembus limit. Kalau tembus, SEMUA order simbol itu
// dibuang (venue juga menolak satu set penuh). Strategi seharusnya tidak
// pernah memicu ini.
//

use thiserror::Error;
use tracing::warn;

use crate::domain::Order;
use crate::ledger::Ledger;
use crate::metrics::RISK_REJECTS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RiskError {
    #[error("{symbol}: buys {buys} from position {position} exceed limit {limit}")]
    LongLimit { symbol: String, position: i64, buys: i64, limit: i64 },
    #[error("{symbol}: sells {sells} from position {position} exceed limit {limit}")]
    ShortLimit { symbol: String, position: i64, sells: i64, limit: i64 },
}

pub fn check(symbol: &str, position: i64, limit: i64, orders: &[Order]) -> Result<(), RiskError> {
    let buys: i64 = orders.iter().filter(|o| o.qty > 0).map(|o| o.qty).sum();
    let sells: i64 = orders.iter().filter(|o| o.qty < 0).map(|o| -o.qty).sum();
    if buys > 0 && position + buys > limit {
        return Err(RiskError::LongLimit { symbol: symbol.to_string(), position, buys, limit });
    }
    if sells > 0 && position - sells < -limit {
        return Err(RiskError::ShortLimit { symbol: symbol.to_string(), position, sells, limit });
    }
    Ok(())
}

/// Check one symbol's orders in the ledger; drop them all on breach.
pub fn enforce(ledger: &mut Ledger, symbol: &str, position: i64, limit: i64) -> Result<(), RiskError> {
    match check(symbol, position, limit, ledger.orders_for(symbol)) {
        Ok(()) => Ok(()),
        Err(e) => {
            let dropped = ledger.discard(symbol);
            RISK_REJECTS.with_label_values(&[symbol]).inc();
            warn!(symbol = %symbol, dropped = dropped.len(), error = %e, "risk rejected order set");
            ledger.logf(format_args!("{symbol} risk reject: {e}"));
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_limits_passes() {
        let orders = vec![Order::new("A", 10, 15), Order::new("A", 12, -25)];
        assert!(check("A", 5, 20, &orders).is_ok());
    }

    #[test]
    fn one_past_the_short_limit_is_rejected() {
        assert_eq!(
            check("A", 5, 20, &[Order::new("A", 12, -26)]),
            Err(RiskError::ShortLimit { symbol: "A".into(), position: 5, sells: 26, limit: 20 })
        );
    }

    #[test]
    fn worst_case_long_breach_is_rejected() {
        let orders = vec![Order::new("A", 10, 10), Order::new("A", 9, 6)];
        assert_eq!(
            check("A", 5, 20, &orders),
            Err(RiskError::LongLimit { symbol: "A".into(), position: 5, buys: 16, limit: 20 })
        );
    }

    #[test]
    fn already_breached_position_may_still_reduce() {
        // posisi sudah di luar limit: sell saja tetap boleh
        assert!(check("A", 25, 20, &[Order::new("A", 10, -5)]).is_ok());
        assert!(check("A", 25, 20, &[Order::new("A", 10, 1)]).is_err());
    }

    #[test]
    fn enforce_drops_every_order_of_the_symbol() {
        let mut ledger = Ledger::new();
        ledger.create_order("A", 10, 15);
        ledger.create_order("A", 11, -2);
        ledger.create_order("B", 10, 1);
        assert!(enforce(&mut ledger, "A", 10, 20).is_err());
        let drained = ledger.drain();
        assert!(!drained.orders.contains_key("A"));
        assert_eq!(drained.orders["B"].len(), 1);
        assert!(drained.logs.contains("A risk reject"));
    }
}
