use std::sync::Arc;

use crate::core::error::{ErrorSeverity, OrderError};
use crate::core::exchange::ExchangeGateway;
use crate::core::types::{OrderAck, OrderRequest};
use crate::orders::result::SubmissionResult;
use crate::utils::unified_logger::AuditLog;

/// 下单接口路径（只用于审计日志）
pub const ORDER_ENDPOINT: &str = "/fapi/v1/order";

/// 订单提交器
///
/// 每次调用只提交一笔订单，不重试。提交前后各写一条审计记录。
pub struct OrderSubmitter {
    gateway: Arc<dyn ExchangeGateway>,
    audit: Arc<dyn AuditLog>,
}

impl OrderSubmitter {
    pub fn new(gateway: Arc<dyn ExchangeGateway>, audit: Arc<dyn AuditLog>) -> Self {
        Self { gateway, audit }
    }

    pub fn audit(&self) -> &Arc<dyn AuditLog> {
        &self.audit
    }

    pub async fn submit(&self, request: &OrderRequest) -> SubmissionResult {
        self.audit.info(&format!(
            "API Request: POST {}, Params: {}",
            ORDER_ENDPOINT,
            format_params(request)
        ));

        match self.gateway.create_order(request).await {
            Ok(ack) => {
                self.audit.info(&describe_ack(request, &ack));
                SubmissionResult::Success(ack)
            }
            Err(e) => {
                if e.severity() == ErrorSeverity::Critical {
                    log::error!("🚨 下单请求无法发出 {}: {}", request.symbol, e);
                } else if !e.is_exchange_rejection() {
                    log::warn!("⚠️ 下单请求失败 {}: {}", request.symbol, e);
                }
                let err = OrderError::from(e);
                match &err {
                    OrderError::ExchangeRejected { code, message } => {
                        self.audit
                            .error(&format!("API Error: {} - {}", code, message));
                    }
                    other => self.audit.error(&format!("Order Error: {}", other)),
                }
                SubmissionResult::Failure(err)
            }
        }
    }
}

/// `{symbol: BTCUSDT, side: BUY, ...}`
pub fn format_params(request: &OrderRequest) -> String {
    let body = request
        .to_params()
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", body)
}

fn describe_ack(request: &OrderRequest, ack: &OrderAck) -> String {
    let mut line = format!(
        "Order Placed: {} {}, {}, Qty: {}",
        request.order_type.as_exchange_str(),
        request.side,
        ack.symbol,
        request.quantity.normalize()
    );
    if let Some(price) = request.price {
        line.push_str(&format!(", Price: {}", price.normalize()));
    }
    if let Some(stop) = request.stop_price {
        line.push_str(&format!(", Stop: {}", stop.normalize()));
    }
    line.push_str(&format!(
        ", Status: {}, Order ID: {}",
        ack.status, ack.order_id
    ));
    line
}
