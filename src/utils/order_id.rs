/// 客户端订单ID生成器
///
/// 为策略的每一条子订单生成唯一且可识别的 newClientOrderId，
/// 格式: [策略代码3位][标签≤4位][日时分秒毫秒][运行随机码6位][序号3位]，
/// 只含字母数字，符合币安 36 字符限制
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};

/// 币安 newClientOrderId 最大长度
pub const MAX_CLIENT_ID_LEN: usize = 36;

/// 每个生成器的随机码长度
const RUN_TOKEN_LEN: usize = 6;

/// 订单ID生成器
pub struct OrderIdGenerator {
    strategy_code: String,
    run_token: String,
    sequence: AtomicU32,
}

impl OrderIdGenerator {
    /// 创建新的订单ID生成器
    pub fn new(strategy_code: &str) -> Self {
        let strategy_code: String = strategy_code
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(3)
            .collect::<String>()
            .to_uppercase();

        // 同一秒内启动的多次运行靠随机码区分
        let run_token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RUN_TOKEN_LEN)
            .map(char::from)
            .collect();

        Self {
            strategy_code,
            run_token,
            sequence: AtomicU32::new(0),
        }
    }

    /// 生成带自定义标签的订单ID
    pub fn generate_with_tag(&self, tag: &str) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let timestamp = Utc::now().format("%d%H%M%S%3f");

        // 清理标签（只保留字母数字）
        let clean_tag: String = tag
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(4)
            .collect();

        let mut order_id = format!(
            "{}{}{}{}{:03}",
            self.strategy_code,
            clean_tag,
            timestamp,
            self.run_token,
            seq % 1000
        );
        order_id.truncate(MAX_CLIENT_ID_LEN);
        order_id
    }

    /// 解析订单ID获取策略信息
    pub fn parse_order_id(order_id: &str) -> Option<OrderIdInfo> {
        if order_id.len() < 10 || !order_id.is_ascii() {
            return None;
        }

        let strategy_code = &order_id[..3];
        Some(OrderIdInfo {
            strategy_code: strategy_code.to_string(),
            strategy_name: Self::decode_strategy_code(strategy_code),
            order_id: order_id.to_string(),
        })
    }

    /// 解码策略代码
    fn decode_strategy_code(code: &str) -> String {
        match code {
            "MKT" => "market".to_string(),
            "LMT" => "limit".to_string(),
            "STP" => "stop_limit".to_string(),
            "OCO" => "synthetic_oco".to_string(),
            "TWP" => "twap".to_string(),
            "GRD" => "grid".to_string(),
            _ => format!("unknown_{}", code),
        }
    }
}

/// 订单ID信息
#[derive(Debug, Clone)]
pub struct OrderIdInfo {
    pub strategy_code: String,
    pub strategy_name: String,
    pub order_id: String,
}
