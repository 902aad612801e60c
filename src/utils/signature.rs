use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// 币安签名辅助工具
pub struct SignatureHelper;

impl SignatureHelper {
    /// Binance 签名: HMAC-SHA256(query_string)
    pub fn binance_signature(secret: &str, query_string: &str) -> String {
        Self::hmac_sha256(secret, query_string)
    }

    /// URL 编码并保持键排序
    pub fn build_query_string(params: &[(String, String)]) -> String {
        let mut pairs: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        pairs.sort();
        pairs.join("&")
    }

    /// 毫秒级时间戳
    pub fn timestamp() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// 通用 HMAC-SHA256 帮助方法
    pub fn hmac_sha256(secret: &str, data: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC 支持任意长度密钥");
        mac.update(data.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
