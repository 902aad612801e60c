//! 交易规则缓存
//!
//! 进程启动时拉取一次 exchangeInfo，抽取每个交易对的数量/价格粒度，按交易对直接索引。
//! 拉取失败是独立的 Unavailable 状态，而不是空规则集。

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::exchange::ExchangeGateway;
use crate::core::types::{ExchangeMetadata, SymbolFilter};

/// 永续合约的 contractType
pub const PERPETUAL_CONTRACT: &str = "PERPETUAL";

/// 单个交易对的交易规则
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRule {
    pub symbol: String,
    pub is_perpetual: bool,
    pub min_quantity: Decimal,
    pub quantity_step: Decimal,
    pub min_price: Decimal,
    pub price_tick: Decimal,
}

/// 交易对 -> 规则，构建后只读
#[derive(Debug, Clone, Default)]
pub struct ExchangeRuleSet {
    rules: HashMap<String, SymbolRule>,
}

impl ExchangeRuleSet {
    pub fn new(rules: impl IntoIterator<Item = SymbolRule>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|rule| (rule.symbol.to_uppercase(), rule))
                .collect(),
        }
    }

    /// 从交易所元数据构建规则集
    ///
    /// 缺少 LOT_SIZE / PRICE_FILTER 或粒度不为正的交易对会被跳过。
    pub fn from_metadata(metadata: &ExchangeMetadata) -> Self {
        let mut rules = Vec::with_capacity(metadata.symbols.len());

        for symbol_info in &metadata.symbols {
            let mut lot_size = None;
            let mut price_filter = None;

            for filter in &symbol_info.filters {
                match filter {
                    SymbolFilter::LotSize { min_qty, step_size } => {
                        lot_size = Some((*min_qty, *step_size))
                    }
                    SymbolFilter::PriceFilter {
                        min_price,
                        tick_size,
                    } => price_filter = Some((*min_price, *tick_size)),
                    SymbolFilter::Other => {}
                }
            }

            let ((min_quantity, quantity_step), (min_price, price_tick)) =
                match (lot_size, price_filter) {
                    (Some(lot), Some(price)) => (lot, price),
                    _ => {
                        log::debug!("交易对 {} 缺少数量或价格过滤器，跳过", symbol_info.symbol);
                        continue;
                    }
                };

            if quantity_step <= Decimal::ZERO
                || price_tick <= Decimal::ZERO
                || min_quantity < Decimal::ZERO
            {
                log::warn!(
                    "交易对 {} 的粒度无效 (step={}, tick={}, minQty={})，跳过",
                    symbol_info.symbol,
                    quantity_step,
                    price_tick,
                    min_quantity
                );
                continue;
            }

            rules.push(SymbolRule {
                symbol: symbol_info.symbol.to_uppercase(),
                is_perpetual: symbol_info.contract_type == PERPETUAL_CONTRACT,
                min_quantity,
                quantity_step,
                min_price,
                price_tick,
            });
        }

        Self::new(rules)
    }

    /// 按交易对查询（大小写不敏感）
    pub fn get(&self, symbol: &str) -> Option<&SymbolRule> {
        self.rules.get(&symbol.trim().to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn perpetual_count(&self) -> usize {
        self.rules.values().filter(|r| r.is_perpetual).count()
    }
}

/// 规则快照：已加载或不可用
#[derive(Debug, Clone)]
pub enum RuleSnapshot {
    Ready(Arc<ExchangeRuleSet>),
    Unavailable { reason: String },
}

impl RuleSnapshot {
    pub fn ready(rules: ExchangeRuleSet) -> Self {
        RuleSnapshot::Ready(Arc::new(rules))
    }

    pub fn rules(&self) -> Option<&ExchangeRuleSet> {
        match self {
            RuleSnapshot::Ready(rules) => Some(rules.as_ref()),
            RuleSnapshot::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, RuleSnapshot::Ready(_))
    }
}

/// 交易规则缓存：每个进程加载一次，需要刷新时重新构造
pub struct ExchangeRuleCache {
    gateway: Arc<dyn ExchangeGateway>,
}

impl ExchangeRuleCache {
    pub fn new(gateway: Arc<dyn ExchangeGateway>) -> Self {
        Self { gateway }
    }

    /// 读取一次交易所元数据；任何传输或解析失败都返回 Unavailable
    pub async fn fetch(&self) -> RuleSnapshot {
        match self.gateway.get_exchange_metadata().await {
            Ok(metadata) => {
                let rules = ExchangeRuleSet::from_metadata(&metadata);
                log::info!(
                    "✅ 已加载 {} 交易规则: {} 个交易对 (永续 {})",
                    self.gateway.name(),
                    rules.len(),
                    rules.perpetual_count()
                );
                RuleSnapshot::ready(rules)
            }
            Err(e) => {
                log::error!("获取交易规则失败: {}", e);
                RuleSnapshot::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}
