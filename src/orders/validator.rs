//! 下单前校验
//!
//! 校验是 (意图, 规则快照) 的纯函数：不访问网络、不修改状态，遇到第一个失败项立即返回。

use rust_decimal::Decimal;

use crate::core::error::OrderError;
use crate::core::types::OrderSide;
use crate::orders::decomposer::{grid_price_iter, twap_chunk_quantity, MAX_GRID_LEVELS};
use crate::orders::intent::OrderIntent;
use crate::orders::rules::{ExchangeRuleSet, RuleSnapshot, SymbolRule};
use crate::utils::precision::is_multiple_of;

pub const RULES_UNAVAILABLE_REASON: &str = "could not retrieve trading rules";

/// 被拒绝的字段与原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub field: String,
    pub reason: String,
}

impl Rejection {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// 给原因加上腿/字段前缀，例如 "Invalid stop price: ..."
    fn prefixed(self, prefix: Option<&str>) -> Self {
        match prefix {
            Some(prefix) => Self {
                reason: format!("Invalid {}: {}", prefix, self.reason),
                ..self
            },
            None => self,
        }
    }
}

/// 校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(Rejection),
    /// 规则未能获取，无法校验也无法交易
    Unavailable,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Valid => None,
            ValidationOutcome::Invalid(rejection) => Some(&rejection.reason),
            ValidationOutcome::Unavailable => Some(RULES_UNAVAILABLE_REASON),
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Invalid(rejection) => Some(&rejection.field),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<(), OrderError> {
        match self {
            ValidationOutcome::Valid => Ok(()),
            ValidationOutcome::Invalid(Rejection { field, reason }) => {
                Err(OrderError::ValidationRejected { field, reason })
            }
            ValidationOutcome::Unavailable => Err(OrderError::RuleUnavailable),
        }
    }
}

/// 订单校验器（无状态）
pub struct OrderValidator;

impl OrderValidator {
    /// 校验交易意图
    pub fn validate(intent: &OrderIntent, rules: &RuleSnapshot) -> ValidationOutcome {
        let rules = match rules.rules() {
            Some(rules) => rules,
            None => return ValidationOutcome::Unavailable,
        };

        match Self::check_intent(intent, rules) {
            Ok(()) => ValidationOutcome::Valid,
            Err(rejection) => ValidationOutcome::Invalid(rejection),
        }
    }

    // 方向在解析阶段已归一化为 OrderSide，这里只剩数值和交叉字段检查
    fn check_intent(intent: &OrderIntent, rules: &ExchangeRuleSet) -> Result<(), Rejection> {
        match intent {
            OrderIntent::Market {
                symbol, quantity, ..
            } => {
                let rule = Self::check_symbol(rules, symbol)?;
                Self::check_quantity(rule, "quantity", None, *quantity)
            }
            OrderIntent::Limit {
                symbol,
                quantity,
                price,
                ..
            } => {
                let rule = Self::check_symbol(rules, symbol)?;
                Self::check_quantity(rule, "quantity", None, *quantity)?;
                Self::check_price(rule, "price", None, *price)
            }
            OrderIntent::StopLimit {
                symbol,
                side,
                quantity,
                stop_price,
                limit_price,
            } => {
                let rule = Self::check_symbol(rules, symbol)?;
                Self::check_quantity(rule, "quantity", None, *quantity)?;
                Self::check_price(rule, "stop_price", Some("stop price"), *stop_price)?;
                Self::check_price(rule, "limit_price", Some("limit price"), *limit_price)?;
                Self::check_stop_limit_order(*side, *stop_price, *limit_price)
            }
            OrderIntent::SyntheticOco {
                symbol,
                side,
                quantity,
                take_profit_price,
                stop_loss_price,
            } => {
                let rule = Self::check_symbol(rules, symbol)?;
                Self::check_quantity(rule, "quantity", None, *quantity)?;
                Self::check_price(
                    rule,
                    "take_profit_price",
                    Some("take-profit price"),
                    *take_profit_price,
                )?;
                Self::check_price(
                    rule,
                    "stop_loss_price",
                    Some("stop-loss price"),
                    *stop_loss_price,
                )?;
                Self::check_oco_order(*side, *take_profit_price, *stop_loss_price)
            }
            OrderIntent::Twap {
                symbol,
                total_quantity,
                duration_secs,
                ..
            } => {
                let rule = Self::check_symbol(rules, symbol)?;
                Self::check_quantity(rule, "quantity", None, *total_quantity)?;
                if *duration_secs == 0 {
                    return Err(Rejection::new(
                        "duration",
                        "Duration must be a positive integer (seconds).",
                    ));
                }
                let chunk = twap_chunk_quantity(*total_quantity);
                Self::check_quantity(rule, "chunk_quantity", Some("chunk quantity"), chunk)
            }
            OrderIntent::Grid {
                symbol,
                low_price,
                high_price,
                levels,
                quantity_per_level,
                ..
            } => {
                let rule = Self::check_symbol(rules, symbol)?;
                Self::check_price(rule, "low_price", Some("low price"), *low_price)?;
                Self::check_price(rule, "high_price", Some("high price"), *high_price)?;
                if low_price >= high_price {
                    return Err(Rejection::new(
                        "low_price",
                        "Low price must be less than high price.",
                    ));
                }
                if *levels < 2 {
                    return Err(Rejection::new("levels", "Grid levels must be at least 2."));
                }
                if *levels > MAX_GRID_LEVELS {
                    return Err(Rejection::new(
                        "levels",
                        format!("Grid levels must be at most {}.", MAX_GRID_LEVELS),
                    ));
                }
                Self::check_quantity(rule, "quantity", None, *quantity_per_level)?;
                for price in grid_price_iter(*low_price, *high_price, *levels) {
                    let prefix = format!("grid price {}", price.normalize());
                    Self::check_price(rule, "grid_price", Some(prefix.as_str()), price)?;
                }
                Ok(())
            }
        }
    }

    /// 交易对必须存在且为永续合约
    pub fn check_symbol<'a>(
        rules: &'a ExchangeRuleSet,
        symbol: &str,
    ) -> Result<&'a SymbolRule, Rejection> {
        match rules.get(symbol) {
            Some(rule) if rule.is_perpetual => Ok(rule),
            _ => Err(Rejection::new(
                "symbol",
                format!(
                    "Unknown symbol '{}'. Enter a valid USDT-M perpetual pair like BTCUSDT.",
                    symbol.trim().to_uppercase()
                ),
            )),
        }
    }

    /// 数量: > 0，≥ minQty，且为 stepSize 的整数倍
    pub fn check_quantity(
        rule: &SymbolRule,
        field: &str,
        prefix: Option<&str>,
        quantity: Decimal,
    ) -> Result<(), Rejection> {
        let result = if quantity <= Decimal::ZERO {
            Err(Rejection::new(field, "Quantity must be positive."))
        } else if quantity < rule.min_quantity {
            Err(Rejection::new(
                field,
                format!(
                    "Quantity must be at least {} for {}.",
                    rule.min_quantity.normalize(),
                    rule.symbol
                ),
            ))
        } else if !is_multiple_of(quantity, rule.quantity_step) {
            Err(Rejection::new(
                field,
                format!(
                    "Quantity must be a multiple of {} for {}.",
                    rule.quantity_step.normalize(),
                    rule.symbol
                ),
            ))
        } else {
            Ok(())
        };
        result.map_err(|r| r.prefixed(prefix))
    }

    /// 价格: > 0，≥ minPrice，且为 tickSize 的整数倍
    pub fn check_price(
        rule: &SymbolRule,
        field: &str,
        prefix: Option<&str>,
        price: Decimal,
    ) -> Result<(), Rejection> {
        let result = if price <= Decimal::ZERO {
            Err(Rejection::new(field, "Price must be positive."))
        } else if price < rule.min_price {
            Err(Rejection::new(
                field,
                format!(
                    "Price must be at least {} for {}.",
                    rule.min_price.normalize(),
                    rule.symbol
                ),
            ))
        } else if !is_multiple_of(price, rule.price_tick) {
            Err(Rejection::new(
                field,
                format!(
                    "Price must be a multiple of {} for {}.",
                    rule.price_tick.normalize(),
                    rule.symbol
                ),
            ))
        } else {
            Ok(())
        };
        result.map_err(|r| r.prefixed(prefix))
    }

    /// 止损限价: 买入时触发价必须高于限价，卖出时必须低于限价
    fn check_stop_limit_order(
        side: OrderSide,
        stop_price: Decimal,
        limit_price: Decimal,
    ) -> Result<(), Rejection> {
        match side {
            OrderSide::Buy if stop_price <= limit_price => Err(Rejection::new(
                "stop_price",
                "For buy, stop price must be greater than limit price.",
            )),
            OrderSide::Sell if stop_price >= limit_price => Err(Rejection::new(
                "stop_price",
                "For sell, stop price must be less than limit price.",
            )),
            _ => Ok(()),
        }
    }

    /// 合成 OCO: 买入时止盈价高于止损价，卖出时相反
    fn check_oco_order(
        side: OrderSide,
        take_profit_price: Decimal,
        stop_loss_price: Decimal,
    ) -> Result<(), Rejection> {
        match side {
            OrderSide::Buy if take_profit_price <= stop_loss_price => Err(Rejection::new(
                "take_profit_price",
                "For buy, take-profit price must be greater than stop-loss price.",
            )),
            OrderSide::Sell if take_profit_price >= stop_loss_price => Err(Rejection::new(
                "take_profit_price",
                "For sell, take-profit price must be less than stop-loss price.",
            )),
            _ => Ok(()),
        }
    }
}
