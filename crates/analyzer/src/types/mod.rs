pub mod indicator;
pub mod market_data;
pub mod report;
pub mod sentiment;
pub mod timeframe;
pub mod trend;

pub use indicator::{IndicatorFrame, IndicatorRow};
pub use market_data::{Candle, CandleSeries, TickerChange};
pub use report::{format_price, AnalysisReport, MultiTimeframeReport, OmittedTimeframe};
pub use sentiment::{SentimentLabel, SentimentResult, SentimentStatus};
pub use timeframe::Timeframe;
pub use trend::{
    Divergence, MacdAnalysis, MacdDirection, RsiAnalysis, RsiStatus, SupportResistance,
    TrendDirection, TrendSnapshot,
};
