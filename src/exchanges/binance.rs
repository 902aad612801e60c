use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::core::{
    config::{ApiKeys, ExchangeSettings},
    error::ExchangeError,
    exchange::ExchangeGateway,
    types::*,
};
use crate::utils::SignatureHelper;

const USER_AGENT: &str = "perpbot/0.1.0";

/// 币安 U本位合约网关
pub struct BinanceFuturesGateway {
    client: reqwest::Client,
    base_url: String,
    /// 只查询行情时可以不配置密钥
    api_keys: Option<ApiKeys>,
    recv_window_ms: u64,
    /// 时间偏移量（毫秒）= 服务器时间 - 本地时间
    time_offset: Mutex<i64>,
    time_synced: AtomicBool,
}

impl BinanceFuturesGateway {
    pub fn new(settings: &ExchangeSettings, api_keys: Option<ApiKeys>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.futures_base_url(),
            api_keys,
            recv_window_ms: settings.recv_window_ms,
            time_offset: Mutex::new(0),
            time_synced: AtomicBool::new(false),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 同步服务器时间；失败时偏移保持为 0，不影响后续请求
    pub async fn sync_server_time(&self) {
        self.time_synced.store(true, Ordering::SeqCst);

        match self.get_server_time().await {
            Ok(server_time) => {
                let offset = server_time.timestamp_millis() - Utc::now().timestamp_millis();
                if let Ok(mut guard) = self.time_offset.lock() {
                    *guard = offset;
                }
                log::info!("✅ Binance 服务器时间同步成功，时间偏移: {}ms", offset);
            }
            Err(e) => {
                log::warn!("⚠️ 无法同步 Binance 服务器时间，使用本地时间: {}", e);
            }
        }
    }

    /// 校正后的时间戳（毫秒）
    fn corrected_timestamp(&self) -> i64 {
        let offset = self.time_offset.lock().map(|guard| *guard).unwrap_or(0);
        SignatureHelper::timestamp() + offset
    }

    /// 发送认证请求
    async fn send_signed_request<T>(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        mut params: Vec<(String, String)>,
    ) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let api_keys = self
            .api_keys
            .as_ref()
            .ok_or_else(|| ExchangeError::AuthError("未配置 Binance API 密钥".to_string()))?;

        if !self.time_synced.load(Ordering::SeqCst) {
            self.sync_server_time().await;
        }

        params.push((
            "timestamp".to_string(),
            self.corrected_timestamp().to_string(),
        ));
        params.push(("recvWindow".to_string(), self.recv_window_ms.to_string()));

        let query_string = SignatureHelper::build_query_string(&params);
        let signature = SignatureHelper::binance_signature(&api_keys.api_secret, &query_string);
        let url = format!(
            "{}{}?{}&signature={}",
            self.base_url, endpoint, query_string, signature
        );

        let response = self
            .client
            .request(method, &url)
            .header("X-MBX-APIKEY", &api_keys.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// 发送公共请求
    async fn send_public_request<T>(&self, endpoint: &str, params: &[(String, String)]) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut url = format!("{}{}", self.base_url, endpoint);
        if !params.is_empty() {
            url = format!("{}?{}", url, SignatureHelper::build_query_string(params));
        }

        let response = self.client.get(&url).send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T>(response: reqwest::Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(parse_error_body(status.as_u16(), &body))
        }
    }
}

/// 币安错误响应 `{"code": -2019, "msg": "Margin is insufficient."}`
#[derive(Deserialize)]
struct BinanceErrorBody {
    code: i32,
    msg: String,
}

/// 解析错误响应；无法解析时用 HTTP 状态码和原始内容
pub fn parse_error_body(status: u16, body: &str) -> ExchangeError {
    match serde_json::from_str::<BinanceErrorBody>(body) {
        Ok(err) => ExchangeError::ApiError {
            code: err.code,
            message: err.msg,
        },
        Err(_) => ExchangeError::ApiError {
            code: status as i32,
            message: if body.is_empty() {
                "未知错误".to_string()
            } else {
                body.to_string()
            },
        },
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceOrderResponse {
    order_id: i64,
    #[serde(default)]
    client_order_id: Option<String>,
    symbol: String,
    status: String,
    orig_qty: Decimal,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    stop_price: Option<Decimal>,
    #[serde(default)]
    update_time: i64,
}

impl From<BinanceOrderResponse> for OrderAck {
    fn from(resp: BinanceOrderResponse) -> Self {
        // 市价单/条件市价单的 price 和 stopPrice 返回 "0"
        let non_zero = |v: Option<Decimal>| v.filter(|d| !d.is_zero());
        OrderAck {
            order_id: resp.order_id.to_string(),
            client_order_id: resp.client_order_id,
            symbol: resp.symbol,
            status: resp.status,
            quantity: resp.orig_qty,
            price: non_zero(resp.price),
            stop_price: non_zero(resp.stop_price),
            update_time: DateTime::from_timestamp_millis(resp.update_time)
                .unwrap_or_else(Utc::now),
        }
    }
}

/// 解析一行K线: [开盘时间, 开盘价, 最高价, 最低价, 收盘价, 成交量, 收盘时间, ...]
pub fn parse_kline_row(symbol: &str, interval: Interval, row: &[serde_json::Value]) -> Option<Kline> {
    if row.len() < 6 {
        return None;
    }

    let decimal = |v: &serde_json::Value| v.as_str().and_then(|s| Decimal::from_str(s).ok());

    Some(Kline {
        symbol: symbol.to_string(),
        interval: interval.as_str().to_string(),
        open_time: DateTime::from_timestamp_millis(row[0].as_i64()?)?,
        open: decimal(&row[1])?,
        high: decimal(&row[2])?,
        low: decimal(&row[3])?,
        close: decimal(&row[4])?,
        volume: decimal(&row[5])?,
    })
}

#[async_trait]
impl ExchangeGateway for BinanceFuturesGateway {
    fn name(&self) -> &str {
        "Binance Futures"
    }

    async fn get_exchange_metadata(&self) -> Result<ExchangeMetadata> {
        self.send_public_request("/fapi/v1/exchangeInfo", &[]).await
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<OrderAck> {
        let resp: BinanceOrderResponse = self
            .send_signed_request(reqwest::Method::POST, "/fapi/v1/order", request.to_params())
            .await?;
        Ok(resp.into())
    }

    async fn get_server_time(&self) -> Result<DateTime<Utc>> {
        #[derive(Deserialize)]
        struct ServerTime {
            #[serde(rename = "serverTime")]
            server_time: i64,
        }

        let time: ServerTime = self.send_public_request("/fapi/v1/time", &[]).await?;
        DateTime::from_timestamp_millis(time.server_time)
            .ok_or_else(|| ExchangeError::ParseError(format!("无效的服务器时间: {}", time.server_time)))
    }

    async fn get_klines(&self, symbol: &str, interval: Interval, limit: u32) -> Result<Vec<Kline>> {
        let symbol = symbol.trim().to_uppercase();
        let params = vec![
            ("symbol".to_string(), symbol.clone()),
            ("interval".to_string(), interval.as_str().to_string()),
            ("limit".to_string(), limit.to_string()),
        ];

        let rows: Vec<Vec<serde_json::Value>> =
            self.send_public_request("/fapi/v1/klines", &params).await?;

        let klines: Vec<Kline> = rows
            .iter()
            .filter_map(|row| parse_kline_row(&symbol, interval, row))
            .collect();
        if klines.len() < rows.len() {
            log::warn!("⚠️ {} 根K线解析失败，已跳过", rows.len() - klines.len());
        }
        Ok(klines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_error_body() {
        match parse_error_body(400, r#"{"code":-1111,"msg":"Precision is over the maximum defined for this asset."}"#) {
            ExchangeError::ApiError { code, message } => {
                assert_eq!(code, -1111);
                assert_eq!(message, "Precision is over the maximum defined for this asset.");
            }
            other => panic!("unexpected: {:?}", other),
        }

        match parse_error_body(502, "Bad Gateway") {
            ExchangeError::ApiError { code, message } => {
                assert_eq!(code, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_order_response_to_ack() {
        let json = r#"{
            "orderId": 4079843926,
            "symbol": "BTCUSDT",
            "status": "NEW",
            "clientOrderId": "OCOTP19101500000",
            "price": "0.00",
            "origQty": "0.010",
            "stopPrice": "70000.00",
            "reduceOnly": true,
            "type": "TAKE_PROFIT_MARKET",
            "updateTime": 1760832000000
        }"#;

        let ack: OrderAck = serde_json::from_str::<BinanceOrderResponse>(json)
            .unwrap()
            .into();
        assert_eq!(ack.order_id, "4079843926");
        assert_eq!(ack.quantity, dec!(0.010));
        assert_eq!(ack.price, None);
        assert_eq!(ack.stop_price, Some(dec!(70000.00)));
        assert_eq!(ack.update_time.timestamp_millis(), 1760832000000);
    }

    #[test]
    fn test_parse_kline_row() {
        let row: Vec<serde_json::Value> = serde_json::from_str(
            r#"[1760832000000, "106950.10", "107120.00", "106800.50", "107000.00", "1234.567", 1760835599999, "0", 100, "0", "0", "0"]"#,
        )
        .unwrap();

        let kline = parse_kline_row("BTCUSDT", Interval::OneHour, &row).unwrap();
        assert_eq!(kline.interval, "1h");
        assert_eq!(kline.open, dec!(106950.10));
        assert_eq!(kline.close, dec!(107000.00));
        assert_eq!(kline.volume, dec!(1234.567));

        assert!(parse_kline_row("BTCUSDT", Interval::OneHour, &row[..3]).is_none());
    }

    #[tokio::test]
    async fn test_signed_request_requires_keys() {
        let gateway = BinanceFuturesGateway::new(&ExchangeSettings::default(), None).unwrap();
        let request = OrderRequest::market("BTCUSDT", OrderSide::Buy, dec!(0.001));

        match gateway.create_order(&request).await {
            Err(ExchangeError::AuthError(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }
}
