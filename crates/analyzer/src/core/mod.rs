pub mod data_service;
pub mod indicators;
pub mod market_source;
pub mod mtf_aggregator;
pub mod sentiment;
pub mod trend_classifier;

pub use market_source::MarketDataSource;
pub use mtf_aggregator::MultiTimeframeAggregator;
