// ===============================
// src/main.rs
// ===============================
/*
 # replay file tick JSONL, rekam keputusan, dump metrics di akhir
 cargo run --release -- --ticks data/ticks.jsonl --record out/decisions.jsonl --metrics-out out/metrics.prom

 # sesi mock deterministik
 MOCK_TICKS=5000 MOCK_SEED=42 RUST_LOG=tick_trader=debug cargo run
*/
/*
=============================================================================
Project : tick_trader — deterministic per-tick trading decision engine
Module  : main.rs
Version : 0.5.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
Email   : kukuhtw@gmail.com
WhatsApp: https://wa.me/628129893706
LinkedIn: https://id.linkedin.com/in/kukuhtw
License : MIT (see LICENSE)

Summary : Replays market ticks (JSONL or seeded mock) through the decision
          engine one tick at a time, hands the state blob back each call,
          tracks positions/PnL, records JSONL decisions, and dumps
          Prometheus metrics on exit.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::error::Error;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tick_trader::config::{self, StrategyConfig};
use tick_trader::domain::{Decision, Event, TickInput};
use tick_trader::metrics::{self, CONFIG_STRATEGY, DECISION_LATENCY_US};
use tick_trader::{feed, positions, recorder, Trader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // ---- Logging ----
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ---- Load config ----
    let (args, engine) = config::load()?;

    // ---- Metrics ----
    metrics::init();

    // ---- Startup info + export config to metrics ----
    let strategies: Vec<String> =
        engine.products.iter().map(|(s, p)| format!("{s}:{}", p.strategy.label())).collect();
    info!(
        source = %args.ticks_file.as_deref().unwrap_or("mock"),
        mock_ticks = args.mock_ticks,
        mock_seed = args.mock_seed,
        record = ?args.record_file,
        strategies = ?strategies,
        "startup config"
    );
    for (sym, p) in &engine.products {
        CONFIG_STRATEGY.with_label_values(&[sym.as_str(), p.strategy.label()]).set(p.limit);
        if let StrategyConfig::Conversion(c) = &p.strategy {
            if !c.apply_storage_fee {
                info!(symbol = %sym, storage_fee = c.storage_fee, "storage fee tracked but not applied");
            }
        }
    }

    // ---- Buses ----
    let (tick_tx, mut tick_rx) = mpsc::channel::<TickInput>(1024);
    let (pos_tx, pos_rx) = mpsc::channel::<TickInput>(1024);

    // ---- Recorder (optional) ----
    let (mut rec_tx, recorder_task) = match args.record_file.clone() {
        Some(path) => {
            let (tx, rx) = mpsc::channel::<Event>(8192);
            (Some(tx), Some(tokio::spawn(recorder::run(rx, path))))
        }
        None => (None, None),
    };

    // ---- Positions / PnL ----
    let positions_task = tokio::spawn(positions::run(pos_rx));

    // ---- FEED ----
    let feed_task = match args.ticks_file.clone() {
        Some(path) => tokio::spawn(feed::run_replay(tick_tx, path)),
        None => {
            let (cfg, n, seed) = (engine.clone(), args.mock_ticks, args.mock_seed);
            tokio::spawn(async move { Ok::<u64, feed::FeedError>(feed::run_mock(tick_tx, cfg, n, seed).await) })
        }
    };

    // ---- Engine loop: satu tick, satu panggilan, berurutan ----
    let mut trader = Trader::new(&engine);
    let mut blob = String::new();
    let mut decided: u64 = 0;
    if let Some(tx) = &rec_tx {
        let _ = tx.send(Event::Note(format!("session start, {} instruments", engine.products.len()))).await;
    }
    while let Some(mut tick) = tick_rx.recv().await {
        // harness contract: blob tick sebelumnya dikembalikan apa adanya
        tick.trader_data = std::mem::take(&mut blob);

        let started = Instant::now();
        let output = trader.run(&tick);
        let latency_us = started.elapsed().as_micros() as u64;
        DECISION_LATENCY_US.observe(latency_us as f64);
        decided += 1;

        blob = output.trader_data.clone();
        let rec_closed = match &rec_tx {
            Some(tx) => {
                let decision = Decision { timestamp: tick.timestamp, recorded_at: Utc::now().to_rfc3339(), latency_us, output };
                tx.send(Event::Decision(decision)).await.is_err()
            }
            None => false,
        };
        if rec_closed {
            warn!("recorder channel closed, decisions no longer recorded");
            rec_tx = None;
        }
        let _ = pos_tx.send(tick).await;
    }

    // ---- Shutdown: tutup channel, tunggu task ----
    drop(rec_tx);
    drop(pos_tx);
    match feed_task.await? {
        Ok(sent) => info!(sent, decided, "feed finished"),
        Err(e) => warn!(error = %e, "feed failed"),
    }
    let pnl = positions_task.await?;
    if let Some(task) = recorder_task {
        match task.await? {
            Ok(written) => info!(written, "recorder finished"),
            Err(e) => warn!(error = %e, "recorder failed"),
        }
    }
    info!(
        ticks = trader.ticks(),
        realized = pnl.total_realized(),
        unrealized = pnl.total_unrealized(),
        "session done"
    );

    if let Some(path) = &args.metrics_out {
        tokio::fs::write(path, metrics::encode()).await?;
        info!(%path, "metrics written");
    }
    Ok(())
}
