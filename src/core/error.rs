use thiserror::Error;

/// 网关层错误（HTTP、序列化、交易所返回的业务错误）
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("网络请求错误: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("API错误: {code} - {message}")]
    ApiError { code: i32, message: String },

    #[error("认证错误: {0}")]
    AuthError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("数据解析错误: {0}")]
    ParseError(String),

    #[error("其他错误: {0}")]
    Other(String),
}

impl ExchangeError {
    /// 是否为交易所自身拒绝（携带交易所错误码）
    pub fn is_exchange_rejection(&self) -> bool {
        matches!(self, ExchangeError::ApiError { .. })
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ExchangeError::NetworkError(_) => ErrorSeverity::Warning,
            ExchangeError::ApiError { .. } => ErrorSeverity::Error,
            ExchangeError::AuthError(_) => ErrorSeverity::Critical,
            ExchangeError::ConfigError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSeverity {
    Warning,
    Error,
    Critical,
}

/// 下单流程的错误分类
///
/// 校验错误永远不会到达提交层；提交错误按子订单记录，不会中断兄弟订单。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("could not retrieve trading rules")]
    RuleUnavailable,

    #[error("{reason}")]
    ValidationRejected { field: String, reason: String },

    #[error("API Error: {code} - {message}")]
    ExchangeRejected { code: i32, message: String },

    #[error("{0}")]
    TransportFailure(String),
}

impl OrderError {
    pub fn rejected(field: impl Into<String>, reason: impl Into<String>) -> Self {
        OrderError::ValidationRejected {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// 被拒绝的字段（仅校验错误）
    pub fn field(&self) -> Option<&str> {
        match self {
            OrderError::ValidationRejected { field, .. } => Some(field),
            _ => None,
        }
    }

    /// 错误是否在任何网络调用之前产生
    pub fn is_pre_submission(&self) -> bool {
        matches!(
            self,
            OrderError::RuleUnavailable | OrderError::ValidationRejected { .. }
        )
    }
}

impl From<ExchangeError> for OrderError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::ApiError { code, message } => {
                OrderError::ExchangeRejected { code, message }
            }
            other => OrderError::TransportFailure(other.to_string()),
        }
    }
}
