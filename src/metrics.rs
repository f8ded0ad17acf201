// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Engine --------
pub static TICKS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("ticks_total", "ticks processed by the engine").unwrap());

pub static ORDERS_BY: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("orders_total_by", "orders emitted (labels: symbol, side)"),
        &["symbol", "side"],
    )
    .unwrap()
});

pub static CONVERSION_REQUEST: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("conversion_request", "last conversion requested (label: symbol)"),
        &["symbol"],
    )
    .unwrap()
});

pub static STATE_RESETS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("state_resets_total", "strategy state reinitialised (label: reason)"),
        &["reason"],
    )
    .unwrap()
});

pub static RISK_REJECTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("risk_rejects_total", "order sets dropped by the limit guard"),
        &["symbol"],
    )
    .unwrap()
});

// Decision latency per tick (microseconds)
pub static DECISION_LATENCY_US: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("decision_latency_us", "Trader::run wall time (us)")
            .buckets(vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1_000.0, 5_000.0]),
    )
    .unwrap()
});

// -------- Inventory & PnL (harness) --------
pub static INV_QTY: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(Opts::new("inventory_qty", "net qty per symbol"), &["symbol"]).unwrap()
});

pub static PNL_REALIZED: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(Opts::new("pnl_realized", "realized PnL (price ticks)"), &["symbol"]).unwrap()
});

pub static PNL_UNREALIZED: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(Opts::new("pnl_unrealized", "unrealized PnL (price ticks)"), &["symbol"]).unwrap()
});

// ---- Config visibility ----
pub static CONFIG_STRATEGY: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("config_strategy", "configured strategy per symbol, value = limit"),
        &["symbol", "strategy"],
    )
    .unwrap()
});

pub fn init() {
    // Register all metrics to the custom registry; double init is harmless
    for m in [
        REGISTRY.register(Box::new(TICKS.clone())),
        REGISTRY.register(Box::new(ORDERS_BY.clone())),
        REGISTRY.register(Box::new(CONVERSION_REQUEST.clone())),
        REGISTRY.register(Box::new(STATE_RESETS.clone())),
        REGISTRY.register(Box::new(RISK_REJECTS.clone())),
        REGISTRY.register(Box::new(DECISION_LATENCY_US.clone())),
        REGISTRY.register(Box::new(INV_QTY.clone())),
        REGISTRY.register(Box::new(PNL_REALIZED.clone())),
        REGISTRY.register(Box::new(PNL_UNREALIZED.clone())),
        REGISTRY.register(Box::new(CONFIG_STRATEGY.clone())),
    ] {
        let _ = m;
    }
}

/// Encode all metrics in Prometheus text format
pub fn encode() -> String {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.clear();
        buf.extend_from_slice(b"# no metrics\n");
    }
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_metrics_show_up_in_exposition() {
        init();
        init();
        TICKS.inc();
        ORDERS_BY.with_label_values(&["AMETHYSTS", "buy"]).inc();
        let text = encode();
        assert!(text.contains("ticks_total"));
        assert!(text.contains("orders_total_by"));
    }
}
