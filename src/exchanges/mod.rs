// 交易所网关实现
pub mod binance;

pub use binance::BinanceFuturesGateway;
