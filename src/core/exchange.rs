use crate::core::types::{ExchangeMetadata, Interval, Kline, OrderAck, OrderRequest, Result};
use async_trait::async_trait;

/// 交易所网关接口
///
/// 网关负责签名、HTTP 框架和时间同步；核心只依赖这里的操作签名和返回结构。
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// 获取交易所名称
    fn name(&self) -> &str;

    /// 获取交易所元数据（交易对与过滤器）
    async fn get_exchange_metadata(&self) -> Result<ExchangeMetadata>;

    /// 创建订单
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderAck>;

    /// 获取服务器时间
    async fn get_server_time(&self) -> Result<chrono::DateTime<chrono::Utc>>;

    /// 获取K线数据
    async fn get_klines(&self, symbol: &str, interval: Interval, limit: u32)
        -> Result<Vec<Kline>>;
}
