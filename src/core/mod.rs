// 核心模块 - 配置、错误、网关接口和基础类型
pub mod config;
pub mod error;
pub mod exchange;
pub mod types;

pub use self::config::*;
pub use self::error::*;
pub use self::exchange::*;
pub use self::types::{
    ExchangeMetadata, Interval, Kline, OrderAck, OrderRequest, OrderSide, OrderType,
    SymbolFilter, SymbolMetadata, TimeInForce,
};
