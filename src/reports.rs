//! 只读查询：历史K线和恐惧贪婪指数，不经过下单校验

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::core::error::ExchangeError;
use crate::core::exchange::ExchangeGateway;
use crate::core::types::{Interval, Kline, Result};

pub const FEAR_GREED_URL: &str = "https://api.alternative.me/fng/";

/// 恐惧贪婪指数读数
#[derive(Debug, Clone, PartialEq)]
pub struct FearGreedReading {
    pub value: u32,
    pub classification: String,
    pub timestamp: DateTime<Utc>,
}

impl std::fmt::Display for FearGreedReading {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Crypto Fear & Greed Index: {} ({}) at {}",
            self.value,
            self.classification,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

#[derive(Deserialize)]
struct FearGreedResponse {
    data: Vec<FearGreedEntry>,
}

// 接口把数字都编码成字符串
#[derive(Deserialize)]
struct FearGreedEntry {
    value: String,
    value_classification: String,
    timestamp: String,
}

pub fn parse_fear_greed(body: &str) -> Result<FearGreedReading> {
    let response: FearGreedResponse = serde_json::from_str(body)?;
    let entry = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ExchangeError::ParseError("恐惧贪婪指数为空".to_string()))?;

    let value = entry
        .value
        .parse()
        .map_err(|_| ExchangeError::ParseError(format!("无效的指数值: {}", entry.value)))?;
    let timestamp = entry
        .timestamp
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| ExchangeError::ParseError(format!("无效的时间戳: {}", entry.timestamp)))?;

    Ok(FearGreedReading {
        value,
        classification: entry.value_classification,
        timestamp,
    })
}

/// 获取最新的恐惧贪婪指数
pub async fn fetch_fear_greed(url: &str, timeout: Duration) -> Result<FearGreedReading> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExchangeError::ApiError {
            code: status.as_u16() as i32,
            message: "Could not fetch Fear & Greed Index".to_string(),
        });
    }

    parse_fear_greed(&response.text().await?)
}

pub fn format_kline(kline: &Kline) -> String {
    format!(
        "Open Time: {}, Open: {}, High: {}, Low: {}, Close: {}, Volume: {}",
        kline.open_time.format("%Y-%m-%d %H:%M:%S"),
        kline.open,
        kline.high,
        kline.low,
        kline.close,
        kline.volume
    )
}

/// 历史K线报告：标题行 + 每根K线一行
pub async fn history_report(
    gateway: &dyn ExchangeGateway,
    symbol: &str,
    interval: Interval,
    limit: u32,
) -> Result<Vec<String>> {
    let symbol = symbol.trim().to_uppercase();
    let klines = gateway.get_klines(&symbol, interval, limit).await?;

    let mut lines = Vec::with_capacity(klines.len() + 1);
    lines.push(format!(
        "Historical Data for {} ({}, last {}):",
        symbol,
        interval.as_str(),
        limit
    ));
    lines.extend(klines.iter().map(format_kline));
    Ok(lines)
}
