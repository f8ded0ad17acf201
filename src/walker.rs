// ===============================
// src/walker.rs
// ===============================
//
// Book walker: konsumsi likuiditas dari satu sisi ladder, level terbaik dulu.
//
// - `levels` harus sudah dalam urutan prioritas (asks naik, bids turun);
//   pakai `OrderBookSnapshot::asks_asc()` / `bids_desc()`.
// - Berhenti di level pertama yang tidak favorable: harga monoton dalam
//   urutan prioritas, jadi level sesudahnya pasti juga tidak favorable.
// - `cap` negatif diperlakukan sebagai 0.
//

/// One level consumed by the walker. `qty` is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Take { pub price: i64, pub qty: i64 }

pub fn walk<I, F>(levels: I, mut favorable: F, cap: i64) -> Vec<Take>
where
    I: IntoIterator<Item = (i64, i64)>,
    F: FnMut(i64) -> bool,
{
    let mut remaining = cap.max(0);
    let mut takes = Vec::new();
    for (price, volume) in levels {
        if remaining == 0 || !favorable(price) {
            break;
        }
        let volume = volume.saturating_abs();
        if volume == 0 {
            continue;
        }
        let qty = volume.min(remaining);
        takes.push(Take { price, qty });
        remaining -= qty;
    }
    takes
}

pub fn total(takes: &[Take]) -> i64 { takes.iter().map(|t| t.qty).sum() }
