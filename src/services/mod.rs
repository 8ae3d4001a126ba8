pub mod lookup;
pub mod statistics_service;
pub mod trade_service;

pub use statistics_service::StatisticsService;
pub use trade_service::TradeService;
