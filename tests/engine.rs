// ===============================
// tests/engine.rs
// ===============================
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tick_trader::feed::MockMarket;
use tick_trader::{risk, EngineConfig, Order, OrderBookSnapshot, TickInput, TickOutput, Trader};

fn single_fixed_fair() -> EngineConfig {
    let json = r#"{
        "products": {
            "AMETHYSTS": { "limit": 20, "strategy": { "kind": "fixed_fair", "fair": 10000, "edge": 1 } }
        }
    }"#;
    EngineConfig::from_json("inline", json).unwrap()
}

/// Runs a mock session handing the blob back each tick, like the harness does.
fn mock_session(cfg: &EngineConfig, seed: u64, n: usize, mut tweak: impl FnMut(usize, &mut TickInput)) -> Vec<(TickInput, TickOutput)> {
    let mut market = MockMarket::new(cfg, seed);
    let mut trader = Trader::new(cfg);
    let mut blob = String::new();
    (0..n)
        .map(|i| {
            let mut tick = market.next_tick();
            tick.trader_data = std::mem::take(&mut blob);
            tweak(i, &mut tick);
            let out = trader.run(&tick);
            blob = out.trader_data.clone();
            (tick, out)
        })
        .collect()
}

#[test]
fn quiet_book_quotes_one_inside_fair() {
    let mut trader = Trader::new(&single_fixed_fair());
    let mut tick = TickInput::default();
    tick.order_depths.insert("AMETHYSTS".into(), OrderBookSnapshot::new(&[(9998, 5)], &[(10002, -5)]));
    tick.position.insert("AMETHYSTS".into(), 0);

    let out = trader.run(&tick);
    assert_eq!(
        out.orders["AMETHYSTS"],
        vec![Order::new("AMETHYSTS", 9999, 20), Order::new("AMETHYSTS", 10001, -20)]
    );
    assert_eq!(out.conversions, 0);
}

#[test]
fn empty_ladders_yield_no_orders() {
    let mut trader = Trader::new(&single_fixed_fair());
    let mut tick = TickInput::default();
    tick.order_depths.insert("AMETHYSTS".into(), OrderBookSnapshot::default());
    let out = trader.run(&tick);
    assert!(out.orders.is_empty());
    assert!(!out.trader_data.is_empty());
}

#[test]
fn mock_session_never_breaches_limits() {
    let cfg = EngineConfig::default();
    let mut rng = StdRng::seed_from_u64(17);
    let positions: Vec<Vec<(String, i64)>> = (0..400)
        .map(|_| {
            cfg.products
                .iter()
                .map(|(s, p)| (s.clone(), rng.gen_range(-p.limit..=p.limit)))
                .collect()
        })
        .collect();

    let session = mock_session(&cfg, 9, 400, |i, tick| {
        for (s, pos) in &positions[i] {
            tick.position.insert(s.clone(), *pos);
        }
    });
    for (tick, out) in &session {
        for (sym, orders) in &out.orders {
            let limit = cfg.limit_of(sym).unwrap();
            assert!(risk::check(sym, tick.position_of(sym), limit, orders).is_ok(), "{sym} at {}", tick.timestamp);
            assert!(orders.iter().all(|o| o.qty != 0 && &o.symbol == sym));
        }
        assert!(!out.logs.contains("risk reject"));
    }
}

#[test]
fn conversion_flattens_reported_position_every_tick() {
    let cfg = EngineConfig::default();
    let session = mock_session(&cfg, 4, 120, |i, tick| {
        tick.position.insert("ORCHIDS".into(), (i as i64 % 41) - 20);
    });
    for (tick, out) in &session {
        assert_eq!(out.conversions, -tick.position_of("ORCHIDS"));
    }
}

#[test]
fn same_input_same_output() {
    let cfg = EngineConfig::default();
    let a = mock_session(&cfg, 1234, 250, |_, _| {});
    let b = mock_session(&cfg, 1234, 250, |_, _| {});
    let outs = |s: &[(TickInput, TickOutput)]| s.iter().map(|(_, o)| serde_json::to_string(o).unwrap()).collect::<Vec<_>>();
    assert_eq!(outs(&a), outs(&b));
}

#[test]
fn blob_is_versioned_json_and_counts_ticks() {
    let cfg = EngineConfig::default();
    let session = mock_session(&cfg, 2, 10, |_, _| {});
    let (_, last) = session.last().unwrap();
    let v: serde_json::Value = serde_json::from_str(&last.trader_data).unwrap();
    assert_eq!(v["version"], 1);
    assert_eq!(v["ticks"], 10);
    assert_eq!(v["strategies"]["STARFRUIT"]["kind"], "predictive");
}

#[test]
fn lost_blob_mid_session_restarts_cleanly() {
    let cfg = EngineConfig::default();
    let session = mock_session(&cfg, 8, 30, |i, tick| {
        if i == 20 {
            tick.trader_data = "\u{0}garbage".to_string();
        }
    });
    let (_, out) = &session[20];
    let v: serde_json::Value = serde_json::from_str(&out.trader_data).unwrap();
    assert_eq!(v["ticks"], 1);
    let (_, after) = &session[29];
    let v: serde_json::Value = serde_json::from_str(&after.trader_data).unwrap();
    assert_eq!(v["ticks"], 10);
}

#[test]
fn basket_members_log_hedge_expectation() {
    let cfg = EngineConfig::default();
    let session = mock_session(&cfg, 5, 3, |_, _| {});
    let (_, out) = &session[2];
    assert!(out.logs.contains("GIFT_BASKET synthetic_spread="));
    assert!(out.logs.contains("ROSES mode=pass_through"));
    // semua member sudah punya deviation sejak tick pertama
    assert!(!out.logs.contains("expected=n/a"));
}
