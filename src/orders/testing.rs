//! 测试用的网关、审计日志和交易规则样本

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::Level;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

use crate::core::error::ExchangeError;
use crate::core::exchange::ExchangeGateway;
use crate::core::types::{
    ExchangeMetadata, Interval, Kline, OrderAck, OrderRequest, Result,
};
use crate::orders::rules::{ExchangeRuleSet, RuleSnapshot};
use crate::utils::unified_logger::AuditLog;

const SAMPLE_EXCHANGE_INFO: &str = r#"{
    "symbols": [
        {
            "symbol": "BTCUSDT",
            "contractType": "PERPETUAL",
            "status": "TRADING",
            "filters": [
                {"filterType": "PRICE_FILTER", "minPrice": "0.10", "maxPrice": "4529764", "tickSize": "0.10"},
                {"filterType": "LOT_SIZE", "minQty": "0.001", "maxQty": "1000", "stepSize": "0.001"},
                {"filterType": "MARKET_LOT_SIZE", "minQty": "0.001", "maxQty": "120", "stepSize": "0.001"}
            ]
        },
        {
            "symbol": "ETHUSDT",
            "contractType": "PERPETUAL",
            "status": "TRADING",
            "filters": [
                {"filterType": "PRICE_FILTER", "minPrice": "0.01", "maxPrice": "306177", "tickSize": "0.01"},
                {"filterType": "LOT_SIZE", "minQty": "0.01", "maxQty": "10000", "stepSize": "0.01"}
            ]
        },
        {
            "symbol": "BTCUSDT_250926",
            "contractType": "CURRENT_QUARTER",
            "status": "TRADING",
            "filters": [
                {"filterType": "PRICE_FILTER", "minPrice": "0.10", "maxPrice": "4529764", "tickSize": "0.10"},
                {"filterType": "LOT_SIZE", "minQty": "0.001", "maxQty": "500", "stepSize": "0.001"}
            ]
        },
        {
            "symbol": "NOFILTERUSDT",
            "contractType": "PERPETUAL",
            "status": "TRADING"
        }
    ]
}"#;

pub fn sample_metadata() -> ExchangeMetadata {
    serde_json::from_str(SAMPLE_EXCHANGE_INFO).expect("样本 exchangeInfo 应可解析")
}

pub fn sample_snapshot() -> RuleSnapshot {
    RuleSnapshot::ready(ExchangeRuleSet::from_metadata(&sample_metadata()))
}

/// 内存网关：记录每笔请求及其（tokio）时间，可按序号注入失败
pub struct FakeGateway {
    metadata: ExchangeMetadata,
    metadata_error: Mutex<Option<ExchangeError>>,
    metadata_calls: AtomicUsize,
    order_failures: Mutex<HashMap<usize, ExchangeError>>,
    submitted: Mutex<Vec<(Instant, OrderRequest)>>,
    klines: Vec<Kline>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            metadata: sample_metadata(),
            metadata_error: Mutex::new(None),
            metadata_calls: AtomicUsize::new(0),
            order_failures: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            klines: Vec::new(),
        }
    }

    /// 下一次 get_exchange_metadata 返回该错误
    pub fn with_metadata_error(self, err: ExchangeError) -> Self {
        *self.metadata_error.lock().unwrap() = Some(err);
        self
    }

    /// 第 index 笔（从 0 开始）下单返回该错误
    pub fn fail_order(self, index: usize, err: ExchangeError) -> Self {
        self.order_failures.lock().unwrap().insert(index, err);
        self
    }

    pub fn with_klines(mut self, klines: Vec<Kline>) -> Self {
        self.klines = klines;
        self
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn submit_times(&self) -> Vec<Instant> {
        self.submitted.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

#[async_trait]
impl ExchangeGateway for FakeGateway {
    fn name(&self) -> &str {
        "fake"
    }

    async fn get_exchange_metadata(&self) -> Result<ExchangeMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.metadata_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.metadata.clone())
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<OrderAck> {
        let index = {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push((Instant::now(), request.clone()));
            submitted.len() - 1
        };

        if let Some(err) = self.order_failures.lock().unwrap().remove(&index) {
            return Err(err);
        }

        Ok(OrderAck {
            order_id: (index + 1).to_string(),
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            status: "NEW".to_string(),
            quantity: request.quantity,
            price: request.price,
            stop_price: request.stop_price,
            update_time: Utc::now(),
        })
    }

    async fn get_server_time(&self) -> Result<DateTime<Utc>> {
        Ok(Utc::now())
    }

    async fn get_klines(&self, _symbol: &str, _interval: Interval, limit: u32) -> Result<Vec<Kline>> {
        Ok(self.klines.iter().take(limit as usize).cloned().collect())
    }
}

/// 内存审计日志，每行格式为 "LEVEL message"
#[derive(Default)]
pub struct MemoryAudit {
    lines: Mutex<Vec<String>>,
}

impl MemoryAudit {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl AuditLog for MemoryAudit {
    fn record(&self, level: Level, message: &str) {
        self.lines
            .lock()
            .unwrap()
            .push(format!("{} {}", level, message));
    }
}
