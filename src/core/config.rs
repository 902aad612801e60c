use crate::core::error::ExchangeError;
use serde::{Deserialize, Serialize};

pub const TESTNET_FUTURES_URL: &str = "https://testnet.binancefuture.com";
pub const MAINNET_FUTURES_URL: &str = "https://fapi.binance.com";

/// 机器人配置（YAML 文件 + PERPBOT__ 前缀环境变量覆盖）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub exchange: ExchangeSettings,
    pub logging: LoggingSettings,
    pub orders: OrderSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeSettings {
    pub testnet: bool,
    /// 覆盖默认的合约 REST 地址
    pub base_url: Option<String>,
    pub recv_window_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            testnet: true,
            base_url: None,
            recv_window_ms: 5000,
            timeout_secs: 30,
        }
    }
}

impl ExchangeSettings {
    pub fn futures_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if self.testnet => TESTNET_FUTURES_URL.to_string(),
            None => MAINNET_FUTURES_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub file: String,
    pub audit_file: String,
    pub audit_max_size_mb: u64,
    pub console: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "logs/bot.log".to_string(),
            audit_file: "logs/orders_audit.log".to_string(),
            audit_max_size_mb: 10,
            console: false,
        }
    }
}

/// 合成 OCO 两条腿的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcoLegSide {
    /// 与意图方向相同
    #[default]
    Same,
    /// 与意图方向相反（平仓方向）
    Opposite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderSettings {
    pub oco_leg_side: OcoLegSide,
}

impl BotConfig {
    /// 加载配置，文件不存在时使用默认值
    pub fn load(path: &str) -> Result<Self, ExchangeError> {
        let settings = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Yaml).required(false))
            .add_source(config::Environment::with_prefix("PERPBOT").separator("__"))
            .build()
            .map_err(|e| ExchangeError::ConfigError(format!("读取配置失败: {}", e)))?;

        settings
            .try_deserialize()
            .map_err(|e| ExchangeError::ConfigError(format!("解析配置失败: {}", e)))
    }

    /// 从YAML字符串加载
    pub fn from_yaml(contents: &str) -> Result<Self, ExchangeError> {
        serde_yaml::from_str(contents)
            .map_err(|e| ExchangeError::ConfigError(format!("解析配置失败: {}", e)))
    }
}

/// API密钥配置
#[derive(Debug, Clone)]
pub struct ApiKeys {
    pub api_key: String,
    pub api_secret: String,
}

impl ApiKeys {
    /// 从环境变量加载API密钥
    pub fn from_env(exchange: &str) -> Result<Self, ExchangeError> {
        dotenv::dotenv().ok(); // 加载.env文件，忽略错误

        let exchange_upper = exchange.to_uppercase();

        let api_key = std::env::var(format!("{}_API_KEY", exchange_upper)).map_err(|_| {
            ExchangeError::ConfigError(format!("未找到{}的API_KEY环境变量", exchange))
        })?;

        // 尝试两种格式的密钥名称
        let api_secret = std::env::var(format!("{}_SECRET_KEY", exchange_upper))
            .or_else(|_| std::env::var(format!("{}_API_SECRET", exchange_upper)))
            .map_err(|_| {
                ExchangeError::ConfigError(format!(
                    "未找到{}的SECRET_KEY或API_SECRET环境变量",
                    exchange
                ))
            })?;

        Ok(ApiKeys {
            api_key,
            api_secret,
        })
    }
}
