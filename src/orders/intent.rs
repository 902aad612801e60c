use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::error::OrderError;
use crate::core::types::OrderSide;
use crate::orders::decomposer::MAX_GRID_LEVELS;

/// 策略类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    Market,
    Limit,
    StopLimit,
    SyntheticOco,
    Twap,
    Grid,
}

impl StrategyKind {
    /// 客户端订单ID中的策略代码
    pub fn code(&self) -> &'static str {
        match self {
            StrategyKind::Market => "MKT",
            StrategyKind::Limit => "LMT",
            StrategyKind::StopLimit => "STP",
            StrategyKind::SyntheticOco => "OCO",
            StrategyKind::Twap => "TWP",
            StrategyKind::Grid => "GRD",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::Market => "Market",
            StrategyKind::Limit => "Limit",
            StrategyKind::StopLimit => "Stop-Limit",
            StrategyKind::SyntheticOco => "OCO",
            StrategyKind::Twap => "TWAP",
            StrategyKind::Grid => "Grid",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 交易意图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderIntent {
    Market {
        symbol: String,
        side: OrderSide,
        quantity: Decimal,
    },
    Limit {
        symbol: String,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    },
    StopLimit {
        symbol: String,
        side: OrderSide,
        quantity: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
    },
    SyntheticOco {
        symbol: String,
        side: OrderSide,
        quantity: Decimal,
        take_profit_price: Decimal,
        stop_loss_price: Decimal,
    },
    Twap {
        symbol: String,
        side: OrderSide,
        total_quantity: Decimal,
        duration_secs: u64,
    },
    Grid {
        symbol: String,
        side: OrderSide,
        low_price: Decimal,
        high_price: Decimal,
        levels: u32,
        quantity_per_level: Decimal,
    },
}

impl OrderIntent {
    pub fn kind(&self) -> StrategyKind {
        match self {
            OrderIntent::Market { .. } => StrategyKind::Market,
            OrderIntent::Limit { .. } => StrategyKind::Limit,
            OrderIntent::StopLimit { .. } => StrategyKind::StopLimit,
            OrderIntent::SyntheticOco { .. } => StrategyKind::SyntheticOco,
            OrderIntent::Twap { .. } => StrategyKind::Twap,
            OrderIntent::Grid { .. } => StrategyKind::Grid,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            OrderIntent::Market { symbol, .. }
            | OrderIntent::Limit { symbol, .. }
            | OrderIntent::StopLimit { symbol, .. }
            | OrderIntent::SyntheticOco { symbol, .. }
            | OrderIntent::Twap { symbol, .. }
            | OrderIntent::Grid { symbol, .. } => symbol,
        }
    }

    /// 交易所格式的交易对（大写）
    pub fn normalized_symbol(&self) -> String {
        self.symbol().trim().to_uppercase()
    }

    pub fn side(&self) -> OrderSide {
        match self {
            OrderIntent::Market { side, .. }
            | OrderIntent::Limit { side, .. }
            | OrderIntent::StopLimit { side, .. }
            | OrderIntent::SyntheticOco { side, .. }
            | OrderIntent::Twap { side, .. }
            | OrderIntent::Grid { side, .. } => *side,
        }
    }
}

// ============= 输入解析 =============

/// 解析方向（大小写不敏感）
pub fn parse_side(input: &str) -> Result<OrderSide, OrderError> {
    OrderSide::from_str(input)
        .map_err(|_| OrderError::rejected("side", "Side must be 'buy' or 'sell'."))
}

/// 解析十进制数，支持科学计数法
pub fn parse_decimal(field: &str, input: &str, reason: &str) -> Result<Decimal, OrderError> {
    let trimmed = input.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| OrderError::rejected(field, reason))
}

pub fn parse_quantity(field: &str, input: &str) -> Result<Decimal, OrderError> {
    parse_decimal(field, input, "Invalid quantity.")
}

/// `label` 用于错误信息，例如 "stop price"
pub fn parse_price(field: &str, label: &str, input: &str) -> Result<Decimal, OrderError> {
    parse_decimal(field, input, &format!("Invalid {}.", label))
}

pub fn parse_duration(input: &str) -> Result<u64, OrderError> {
    let duration: i64 = input
        .trim()
        .parse()
        .map_err(|_| OrderError::rejected("duration", "Invalid duration."))?;
    if duration < 0 {
        return Err(OrderError::rejected(
            "duration",
            "Duration must be a positive integer (seconds).",
        ));
    }
    Ok(duration as u64)
}

pub fn parse_levels(input: &str) -> Result<u32, OrderError> {
    let levels: i64 = input
        .trim()
        .parse()
        .map_err(|_| OrderError::rejected("levels", "Invalid grid levels."))?;
    if levels < 0 {
        return Err(OrderError::rejected("levels", "Grid levels must be at least 2."));
    }
    u32::try_from(levels).map_err(|_| {
        OrderError::rejected(
            "levels",
            format!("Grid levels must be at most {}.", MAX_GRID_LEVELS),
        )
    })
}
