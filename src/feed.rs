// ===============================
// src/feed.rs
// ===============================
//
// Sumber tick untuk harness:
// - run_replay : baca TickInput JSONL (satu tick per baris). Baris rusak di-skip + warn.
// - run_mock   : sesi sintetis deterministik (seeded), semua instrumen di config.
//
// Notes:
// - Mock = random walk mean-reverting ke reference_price, book 3 level per sisi,
//   volume ask negatif (seperti feed aslinya), observasi konversi untuk
//   instrumen conversion. Posisi selalu 0 (tidak ada simulasi matching).
//

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{EngineConfig, StrategyConfig};
use crate::domain::{ConversionObservation, OrderBookSnapshot, Symbol, TickInput};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("open ticks {path}: {source}")]
    Open { path: String, source: std::io::Error },
    #[error("read ticks {path}: {source}")]
    Read { path: String, source: std::io::Error },
}

/// Blank lines are `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<TickInput>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Replay a JSONL tick file; returns how many ticks were sent.
pub async fn run_replay(tx: mpsc::Sender<TickInput>, path: String) -> Result<u64, FeedError> {
    let file = File::open(&path).await.map_err(|source| FeedError::Open { path: path.clone(), source })?;
    let mut lines = BufReader::new(file).lines();
    info!(%path, "feed: replay started");

    let (mut sent, mut skipped, mut lineno) = (0u64, 0u64, 0u64);
    while let Some(line) = lines.next_line().await.map_err(|source| FeedError::Read { path: path.clone(), source })? {
        lineno += 1;
        match parse_line(&line) {
            Ok(Some(tick)) => {
                if tx.send(tick).await.is_err() {
                    break; // engine sudah berhenti
                }
                sent += 1;
            }
            Ok(None) => {}
            Err(e) => {
                skipped += 1;
                warn!(%path, line = lineno, error = %e, "feed: malformed tick, skipped");
            }
        }
    }
    info!(%path, sent, skipped, "feed: replay finished");
    Ok(sent)
}

struct MockInstrument {
    symbol: Symbol,
    anchor: f64,
    mid: f64,
    conversion: bool,
}

/// Seeded market generator; same seed and config give the same session.
pub struct MockMarket {
    rng: StdRng,
    instruments: Vec<MockInstrument>,
    timestamp: i64,
}

impl MockMarket {
    pub fn new(cfg: &EngineConfig, seed: u64) -> Self {
        let instruments = cfg
            .products
            .iter()
            .map(|(symbol, p)| {
                let anchor = p.reference_price.unwrap_or(1_000) as f64;
                MockInstrument {
                    symbol: symbol.clone(),
                    anchor,
                    mid: anchor,
                    conversion: matches!(p.strategy, StrategyConfig::Conversion(_)),
                }
            })
            .collect();
        Self { rng: StdRng::seed_from_u64(seed), instruments, timestamp: 0 }
    }

    pub fn next_tick(&mut self) -> TickInput {
        let mut tick = TickInput { timestamp: self.timestamp, ..Default::default() };
        self.timestamp += 100;

        for inst in self.instruments.iter_mut() {
            let rng = &mut self.rng;
            // step ~ 5 bps dari harga, minimal 1 tick
            let step = (inst.anchor * 0.0005).max(1.0);
            inst.mid += 0.05 * (inst.anchor - inst.mid) + rng.gen_range(-1.0..=1.0) * step;
            inst.mid = inst.mid.max(1.0);

            let half = (rng.gen_range(1..=3i32) as f64 * step * 0.5).max(1.0);
            let best_bid = (inst.mid - half).floor() as i64;
            let best_ask = ((inst.mid + half).ceil() as i64).max(best_bid + 1);
            let bids: Vec<(i64, i64)> = (0..3).map(|i| (best_bid - i, rng.gen_range(1..=30))).collect();
            let asks: Vec<(i64, i64)> = (0..3).map(|i| (best_ask + i, -rng.gen_range(1..=30))).collect();
            tick.order_depths.insert(inst.symbol.clone(), OrderBookSnapshot::new(&bids, &asks));
            tick.position.insert(inst.symbol.clone(), 0);

            if inst.conversion {
                let bid_price = inst.mid + rng.gen_range(-2.0..=2.0);
                tick.observations.conversion.insert(
                    inst.symbol.clone(),
                    ConversionObservation {
                        bid_price,
                        ask_price: bid_price + rng.gen_range(1.0..=2.0),
                        transport_fees: rng.gen_range(0.8..=1.2),
                        export_tariff: rng.gen_range(0.5..=2.0),
                        import_tariff: rng.gen_range(-4.0..=-1.0),
                        sunlight: rng.gen_range(1_500.0..=4_500.0),
                        humidity: rng.gen_range(55.0..=95.0),
                    },
                );
            }
        }
        tick
    }
}

/// Emit `n` mock ticks; returns how many were accepted by the engine.
pub async fn run_mock(tx: mpsc::Sender<TickInput>, cfg: EngineConfig, n: u64, seed: u64) -> u64 {
    let mut market = MockMarket::new(&cfg, seed);
    info!(ticks = n, seed, instruments = cfg.products.len(), "feed: mock session started");
    let mut sent = 0;
    for _ in 0..n {
        if tx.send(market.next_tick()).await.is_err() {
            break;
        }
        sent += 1;
    }
    sent
}
