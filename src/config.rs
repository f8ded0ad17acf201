// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : tick_trader — deterministic per-tick trading decision engine
Module  : config.rs
Version : 0.5.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
Email   : kukuhtw@gmail.com
WhatsApp: https://wa.me/628129893706
LinkedIn: https://id.linkedin.com/in/kukuhtw
License : MIT (see LICENSE)

Summary : Decides resting and marketable orders per instrument each tick
          (fixed-fair maker, AR predictive maker, cross-venue conversion
          arbitrage, basket relative value), enforces hard position limits,
          persists rolling state as an opaque blob between ticks.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::collections::BTreeMap;
use std::env;
use std::fs;

use clap::Parser;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Symbol;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("parse config {path}: {source}")]
    Parse { path: String, source: serde_json::Error },
    #[error("invalid config for {symbol}: {reason}")]
    Invalid { symbol: String, reason: String },
}

fn invalid(symbol: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { symbol: symbol.to_string(), reason: reason.into() }
}

// ===== Strategi =====

/// Which fair value a basket member trades against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FairValueMode {
    /// Fair value = current mid; the hedge-implied price is only logged.
    #[default]
    PassThrough,
    /// Fair value = hedge-implied price from the other members' deviations.
    Predicted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedFairConfig {
    pub fair: i64,
    #[serde(default = "default_edge")]
    pub edge: i64,
    #[serde(default = "default_soft_limit")]
    pub soft_limit: i64,
    #[serde(default = "default_max_quote")]
    pub max_quote: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictiveConfig {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Per-unit cost of holding inventory one tick. Tracked, not applied
    /// unless `apply_storage_fee` is set.
    #[serde(default = "default_storage_fee")]
    pub storage_fee: f64,
    #[serde(default)]
    pub apply_storage_fee: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self { Self { storage_fee: default_storage_fee(), apply_storage_fee: false } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketMemberConfig {
    /// Other member symbol -> coefficient on its log deviation.
    pub hedge: BTreeMap<Symbol, f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub fair_value_mode: FairValueMode,
    #[serde(default = "default_max_quote")]
    pub max_quote: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    FixedFair(FixedFairConfig),
    Predictive(PredictiveConfig),
    Conversion(ConversionConfig),
    Basket(BasketMemberConfig),
}

impl StrategyConfig {
    pub fn label(&self) -> &'static str {
        match self {
            StrategyConfig::FixedFair(_) => "fixed_fair",
            StrategyConfig::Predictive(_) => "predictive",
            StrategyConfig::Conversion(_) => "conversion",
            StrategyConfig::Basket(_) => "basket",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    pub limit: i64,
    pub strategy: StrategyConfig,
    /// Starting mid for the mock feed; not used by the engine.
    #[serde(default)]
    pub reference_price: Option<i64>,
}

/// Composite instrument = Σ ratio × component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketGroup {
    pub composite: Symbol,
    pub components: BTreeMap<Symbol, i64>,
}

impl BasketGroup {
    pub fn members(&self) -> impl Iterator<Item = &Symbol> {
        std::iter::once(&self.composite).chain(self.components.keys())
    }
    pub fn contains(&self, symbol: &str) -> bool { self.members().any(|m| m == symbol) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub products: BTreeMap<Symbol, ProductConfig>,
    #[serde(default)]
    pub basket: Option<BasketGroup>,
}

fn default_edge() -> i64 { 1 }
fn default_soft_limit() -> i64 { 15 }
fn default_max_quote() -> i64 { 40 }
fn default_storage_fee() -> f64 { 0.1 }

fn product(limit: i64, reference_price: i64, strategy: StrategyConfig) -> ProductConfig {
    ProductConfig { limit, strategy, reference_price: Some(reference_price) }
}

fn basket_member(hedge: &[(&str, f64)], max_quote: i64) -> StrategyConfig {
    StrategyConfig::Basket(BasketMemberConfig {
        hedge: hedge.iter().map(|(s, c)| (s.to_string(), *c)).collect(),
        intercept: 0.0,
        fair_value_mode: FairValueMode::PassThrough,
        max_quote,
    })
}

impl Default for EngineConfig {
    /// Reference scenario. Coefficients are the offline fits.
    fn default() -> Self {
        let mut products = BTreeMap::new();
        products.insert(
            "AMETHYSTS".to_string(),
            product(20, 10_000, StrategyConfig::FixedFair(FixedFairConfig {
                fair: 10_000,
                edge: default_edge(),
                soft_limit: default_soft_limit(),
                max_quote: default_max_quote(),
            })),
        );
        products.insert(
            "STARFRUIT".to_string(),
            product(20, 5_000, StrategyConfig::Predictive(PredictiveConfig {
                coefficients: vec![0.1921, 0.1957, 0.2611, 0.3491],
                intercept: 17.3638,
            })),
        );
        products.insert(
            "ORCHIDS".to_string(),
            product(100, 1_100, StrategyConfig::Conversion(ConversionConfig::default())),
        );
        products.insert(
            "GIFT_BASKET".to_string(),
            product(60, 70_500, basket_member(
                &[("CHOCOLATE", 0.4485), ("STRAWBERRIES", 0.3404), ("ROSES", 0.2057)], 10,
            )),
        );
        products.insert(
            "CHOCOLATE".to_string(),
            product(250, 7_900, basket_member(
                &[("GIFT_BASKET", 1.1630), ("STRAWBERRIES", -0.2107), ("ROSES", -0.1262)], 40,
            )),
        );
        products.insert(
            "STRAWBERRIES".to_string(),
            product(350, 4_000, basket_member(
                &[("GIFT_BASKET", 1.0582), ("CHOCOLATE", -0.1724), ("ROSES", -0.0911)], 40,
            )),
        );
        products.insert(
            "ROSES".to_string(),
            product(60, 14_500, basket_member(
                &[("GIFT_BASKET", 1.3157), ("CHOCOLATE", -0.2046), ("STRAWBERRIES", -0.1478)], 10,
            )),
        );

        let basket = BasketGroup {
            composite: "GIFT_BASKET".to_string(),
            components: [("CHOCOLATE", 4), ("STRAWBERRIES", 6), ("ROSES", 1)]
                .into_iter()
                .map(|(s, r)| (s.to_string(), r))
                .collect(),
        };
        Self { products, basket: Some(basket) }
    }
}

impl EngineConfig {
    pub fn from_json(path: &str, text: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig = serde_json::from_str(text)
            .map_err(|source| ConfigError::Parse { path: path.to_string(), source })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_string(), source })?;
        Self::from_json(path, &text)
    }

    pub fn limit_of(&self, symbol: &str) -> Option<i64> { self.products.get(symbol).map(|p| p.limit) }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (symbol, p) in &self.products {
            if p.limit <= 0 {
                return Err(invalid(symbol, "limit must be positive"));
            }
            match &p.strategy {
                StrategyConfig::FixedFair(c) => {
                    if c.edge <= 0 {
                        return Err(invalid(symbol, "edge must be positive"));
                    }
                    if c.max_quote <= 0 {
                        return Err(invalid(symbol, "max_quote must be positive"));
                    }
                }
                StrategyConfig::Predictive(c) => {
                    if c.coefficients.is_empty() {
                        return Err(invalid(symbol, "predictor needs at least one coefficient"));
                    }
                    if c.coefficients.iter().chain([&c.intercept]).any(|x| !x.is_finite()) {
                        return Err(invalid(symbol, "non-finite predictor coefficient"));
                    }
                }
                StrategyConfig::Conversion(c) => {
                    if !c.storage_fee.is_finite() || c.storage_fee < 0.0 {
                        return Err(invalid(symbol, "storage_fee must be a finite non-negative number"));
                    }
                }
                StrategyConfig::Basket(c) => {
                    let group = self
                        .basket
                        .as_ref()
                        .ok_or_else(|| invalid(symbol, "basket member without a basket group"))?;
                    if !group.contains(symbol) {
                        return Err(invalid(symbol, "not a member of the basket group"));
                    }
                    for other in c.hedge.keys() {
                        if other == symbol || !group.contains(other) {
                            return Err(invalid(symbol, format!("hedge input {other} is not another basket member")));
                        }
                    }
                    if c.max_quote <= 0 {
                        return Err(invalid(symbol, "max_quote must be positive"));
                    }
                }
            }
        }
        if let Some(group) = &self.basket {
            for member in group.members() {
                match self.products.get(member).map(|p| &p.strategy) {
                    Some(StrategyConfig::Basket(_)) => {}
                    _ => return Err(invalid(member, "basket group member needs a basket strategy")),
                }
            }
            if group.components.values().any(|r| *r <= 0) {
                return Err(invalid(&group.composite, "component ratios must be positive"));
            }
        }
        Ok(())
    }
}

// ===== Harness args =====

#[derive(Parser, Clone, Debug, Default)]
#[command(name = "tick_trader", about = "Replay ticks through the decision engine")]
pub struct Cli {
    /// Engine config JSON (default: reference scenario)
    #[arg(long)]
    pub config: Option<String>,
    /// Tick JSONL file to replay; mock feed when absent
    #[arg(long)]
    pub ticks: Option<String>,
    /// Decision JSONL output
    #[arg(long)]
    pub record: Option<String>,
    /// Number of mock ticks
    #[arg(long)]
    pub mock_ticks: Option<u64>,
    /// Mock feed seed
    #[arg(long)]
    pub seed: Option<u64>,
    /// Write prometheus text exposition here on exit
    #[arg(long)]
    pub metrics_out: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Args {
    pub config_file: Option<String>,
    pub ticks_file: Option<String>,
    pub record_file: Option<String>,
    pub mock_ticks: u64,
    pub mock_seed: u64,
    pub metrics_out: Option<String>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// CLI flag menang, lalu ENV (setelah .env dibaca), lalu default.
pub fn resolve(cli: Cli) -> Args {
    let _ = dotenv();

    Args {
        config_file: cli.config.or_else(|| env::var("ENGINE_CONFIG").ok()),
        ticks_file: cli.ticks.or_else(|| env::var("TICKS_FILE").ok()),
        record_file: cli.record.or_else(|| env::var("RECORD_FILE").ok()),
        mock_ticks: cli.mock_ticks.or_else(|| env_parse("MOCK_TICKS")).unwrap_or(1_000),
        mock_seed: cli.seed.or_else(|| env_parse("MOCK_SEED")).unwrap_or(7),
        metrics_out: cli.metrics_out.or_else(|| env::var("METRICS_OUT").ok()),
    }
}

/// File config divalidasi di from_json; default divalidasi di sini.
pub fn engine_config(path: Option<&str>) -> Result<EngineConfig, ConfigError> {
    match path {
        Some(path) => EngineConfig::from_file(path),
        None => {
            let cfg = EngineConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

pub fn load() -> Result<(Args, EngineConfig), ConfigError> {
    let args = resolve(Cli::parse());
    let engine = engine_config(args.config_file.as_deref())?;
    Ok((args, engine))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_scenario_is_valid() {
        let cfg = EngineConfig::default();
        cfg.validate().unwrap();
        let limits: Vec<i64> = ["AMETHYSTS", "STARFRUIT", "ORCHIDS", "GIFT_BASKET", "CHOCOLATE", "STRAWBERRIES", "ROSES"]
            .iter()
            .map(|s| cfg.limit_of(s).unwrap())
            .collect();
        assert_eq!(limits, vec![20, 20, 100, 60, 250, 350, 60]);
    }

    #[test]
    fn parses_json_with_defaults() {
        let json = r#"{
            "products": {
                "AMETHYSTS": { "limit": 20, "strategy": { "kind": "fixed_fair", "fair": 10000 } },
                "ORCHIDS":   { "limit": 100, "strategy": { "kind": "conversion" } }
            }
        }"#;
        let cfg = EngineConfig::from_json("inline", json).unwrap();
        match &cfg.products["AMETHYSTS"].strategy {
            StrategyConfig::FixedFair(c) => {
                assert_eq!((c.edge, c.soft_limit, c.max_quote), (1, 15, 40));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &cfg.products["ORCHIDS"].strategy {
            StrategyConfig::Conversion(c) => assert!(!c.apply_storage_fee),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_predictor() {
        let json = r#"{"products":{"S":{"limit":20,"strategy":{"kind":"predictive","coefficients":[],"intercept":0.0}}}}"#;
        assert!(matches!(EngineConfig::from_json("inline", json), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_non_positive_limit() {
        let mut cfg = EngineConfig::default();
        cfg.products.get_mut("AMETHYSTS").unwrap().limit = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_hedge_outside_group() {
        let mut cfg = EngineConfig::default();
        if let StrategyConfig::Basket(c) = &mut cfg.products.get_mut("ROSES").unwrap().strategy {
            c.hedge.insert("STARFRUIT".to_string(), 0.1);
        }
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_basket_member_without_group() {
        let mut cfg = EngineConfig::default();
        cfg.basket = None;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn engine_config_falls_back_to_reference_scenario() {
        assert_eq!(engine_config(None).unwrap(), EngineConfig::default());
        let missing = std::env::temp_dir().join("tick_trader_no_such_config.json");
        let err = engine_config(Some(&missing.to_string_lossy())).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(EngineConfig::from_json("inline", "{"), Err(ConfigError::Parse { .. })));
    }
}
