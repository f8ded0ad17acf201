// ===============================
// src/predictor.rs
// ===============================
//
// Linear AR(N) forecaster atas mid-price.
//
// - Window: ring buffer berukuran tetap N = jumlah koefisien. Saat penuh,
//   entri tertua dibuang setiap push.
// - Koefisien & intercept dari config (fit offline), tidak pernah diubah
//   oleh fill atau PnL.
// - Window belum penuh -> forecast = mid terakhir.
//

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Fixed-capacity FIFO of recent mid-prices, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceWindow {
    cap: usize,
    values: VecDeque<f64>,
}

impl PriceWindow {
    pub fn new(cap: usize) -> Self {
        Self { cap, values: VecDeque::with_capacity(cap) }
    }

    pub fn push(&mut self, v: f64) {
        if self.cap == 0 {
            return;
        }
        while self.values.len() >= self.cap {
            self.values.pop_front();
        }
        self.values.push_back(v);
    }

    pub fn is_full(&self) -> bool { self.cap > 0 && self.values.len() == self.cap }
    pub fn last(&self) -> Option<f64> { self.values.back().copied() }
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ { self.values.iter().copied() }

    /// Re-apply the configured capacity after a restore, keeping the newest values.
    pub fn resize(&mut self, cap: usize) {
        self.cap = cap;
        while self.values.len() > cap {
            self.values.pop_front();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predictor {
    coefficients: Vec<f64>,
    intercept: f64,
    window: PriceWindow,
}

impl Predictor {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        let window = PriceWindow::new(coefficients.len());
        Self { coefficients, intercept, window }
    }

    pub fn order(&self) -> usize { self.coefficients.len() }

    pub fn observe(&mut self, mid: f64) { self.window.push(mid); }

    /// `None` until the first mid-price has been observed.
    pub fn forecast(&self) -> Option<f64> {
        if !self.window.is_full() {
            return self.window.last();
        }
        let weighted: f64 = self
            .coefficients
            .iter()
            .zip(self.window.iter())
            .map(|(c, x)| c * x)
            .sum();
        Some(self.intercept + weighted)
    }

    /// Acceptable band `[floor(f) - 1, ceil(f) + 1]`.
    pub fn band(&self) -> Option<(i64, i64)> {
        self.forecast().map(|f| (f.floor() as i64 - 1, f.ceil() as i64 + 1))
    }

    pub fn window(&self) -> &PriceWindow { &self.window }

    pub fn reset(&mut self) { self.window = PriceWindow::new(self.order()); }

    pub fn restore_window(&mut self, mut window: PriceWindow) {
        window.resize(self.order());
        self.window = window;
    }
}
