use serde::{Deserialize, Serialize};

/// Per-candle indicator columns aligned with the source candle array.
///
/// Every column has the same length as the input series. `None` marks a row
/// whose trailing window is not yet populated (warm-up), never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorFrame {
    pub close: Vec<f64>,
    pub ma20: Vec<Option<f64>>,
    pub boll_mid: Vec<Option<f64>>,
    pub boll_std: Vec<Option<f64>>,
    pub boll_up: Vec<Option<f64>>,
    pub boll_down: Vec<Option<f64>>,
    pub ma20_trend: Vec<Option<f64>>,
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub macd_hist: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
}

/// Fully-populated view of one frame row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorRow {
    pub close: f64,
    pub ma20: f64,
    pub boll_mid: f64,
    pub boll_std: f64,
    pub boll_up: f64,
    pub boll_down: f64,
    pub ma20_trend: f64,
    pub macd: f64,
    pub signal: f64,
    pub macd_hist: f64,
    pub rsi: f64,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    /// Derived columns in declaration order, paired with their field names.
    pub fn derived_columns(&self) -> [(&'static str, &[Option<f64>]); 10] {
        [
            ("ma20", self.ma20.as_slice()),
            ("boll_mid", self.boll_mid.as_slice()),
            ("boll_std", self.boll_std.as_slice()),
            ("boll_up", self.boll_up.as_slice()),
            ("boll_down", self.boll_down.as_slice()),
            ("ma20_trend", self.ma20_trend.as_slice()),
            ("macd", self.macd.as_slice()),
            ("signal", self.signal.as_slice()),
            ("macd_hist", self.macd_hist.as_slice()),
            ("rsi", self.rsi.as_slice()),
        ]
    }

    /// Row `index` if every derived column is defined there.
    ///
    /// Returns the name of the first undefined column otherwise.
    pub fn row(&self, index: usize) -> Result<IndicatorRow, &'static str> {
        let get = |name: &'static str, col: &[Option<f64>]| -> Result<f64, &'static str> {
            col.get(index).copied().flatten().ok_or(name)
        };

        Ok(IndicatorRow {
            close: self.close.get(index).copied().ok_or("close")?,
            ma20: get("ma20", &self.ma20[..])?,
            boll_mid: get("boll_mid", &self.boll_mid[..])?,
            boll_std: get("boll_std", &self.boll_std[..])?,
            boll_up: get("boll_up", &self.boll_up[..])?,
            boll_down: get("boll_down", &self.boll_down[..])?,
            ma20_trend: get("ma20_trend", &self.ma20_trend[..])?,
            macd: get("macd", &self.macd[..])?,
            signal: get("signal", &self.signal[..])?,
            macd_hist: get("macd_hist", &self.macd_hist[..])?,
            rsi: get("rsi", &self.rsi[..])?,
        })
    }
}
