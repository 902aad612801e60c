//! 策略分解与顺序执行
//!
//! 一个已校验的交易意图被拆成若干原子订单，在当前任务上按顺序逐笔提交。
//! 单笔失败只记录在对应子订单上，后续子订单照常提交，已成交的不撤销。

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::OcoLegSide;
use crate::core::types::{OrderRequest, OrderType, TimeInForce};
use crate::orders::intent::{OrderIntent, StrategyKind};
use crate::orders::result::{LegResult, StrategyResult};
use crate::orders::submitter::OrderSubmitter;
use crate::utils::order_id::OrderIdGenerator;
use crate::utils::precision::round_to;
use crate::utils::unified_logger::AuditLog;

/// TWAP 固定拆分份数
pub const TWAP_CHUNKS: u32 = 10;
/// TWAP 每份数量保留的小数位
pub const TWAP_QUANTITY_DECIMALS: u32 = 8;
/// 网格价格保留的小数位
pub const GRID_PRICE_DECIMALS: u32 = 2;
/// 单个网格最多档数（币安单交易对挂单上限）
pub const MAX_GRID_LEVELS: u32 = 200;

/// TWAP 每份数量: round(total / 10, 8)
pub fn twap_chunk_quantity(total_quantity: Decimal) -> Decimal {
    round_to(
        total_quantity / Decimal::from(TWAP_CHUNKS),
        TWAP_QUANTITY_DECIMALS,
    )
}

/// TWAP 两份之间的间隔: duration / 10
pub fn twap_interval(duration_secs: u64) -> Duration {
    Duration::from_secs(duration_secs) / TWAP_CHUNKS
}

/// 网格各档价格，从低到高，两端包含
///
/// levels < 2 时没有等差序列可言，返回空。
pub fn grid_prices(low_price: Decimal, high_price: Decimal, levels: u32) -> Vec<Decimal> {
    grid_price_iter(low_price, high_price, levels).collect()
}

/// 惰性版本，逐档计算
pub fn grid_price_iter(
    low_price: Decimal,
    high_price: Decimal,
    levels: u32,
) -> impl Iterator<Item = Decimal> {
    let step = if levels < 2 {
        None
    } else {
        (high_price - low_price).checked_div(Decimal::from(levels - 1))
    };
    let count = if step.is_some() { levels } else { 0 };
    let step = step.unwrap_or(Decimal::ZERO);

    (0..count).map(move |i| round_to(low_price + step * Decimal::from(i), GRID_PRICE_DECIMALS))
}

/// 计划中的一条子订单
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLeg {
    pub label: String,
    pub request: OrderRequest,
}

/// 分解结果：有序的子订单和可选的提交间隔
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyPlan {
    pub kind: StrategyKind,
    pub symbol: String,
    pub legs: Vec<PlannedLeg>,
    /// 每笔提交后等待的时间（包括最后一笔）
    pub spacing: Option<Duration>,
}

/// 策略分解器
pub struct StrategyDecomposer {
    oco_leg_side: OcoLegSide,
    audit: Arc<dyn AuditLog>,
}

impl StrategyDecomposer {
    pub fn new(oco_leg_side: OcoLegSide, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            oco_leg_side,
            audit,
        }
    }

    /// 把已校验的意图拆成原子订单，不做任何 I/O
    pub fn plan(&self, intent: &OrderIntent) -> StrategyPlan {
        let kind = intent.kind();
        let symbol = intent.normalized_symbol();
        let ids = OrderIdGenerator::new(kind.code());
        let mut spacing = None;

        let legs: Vec<(String, String, OrderRequest)> = match intent {
            OrderIntent::Market { side, quantity, .. } => vec![(
                "order".to_string(),
                String::new(),
                OrderRequest::market(&symbol, *side, *quantity),
            )],
            OrderIntent::Limit {
                side,
                quantity,
                price,
                ..
            } => vec![(
                "order".to_string(),
                String::new(),
                OrderRequest::limit(&symbol, *side, *quantity, *price),
            )],
            OrderIntent::StopLimit {
                side,
                quantity,
                stop_price,
                limit_price,
                ..
            } => vec![(
                "order".to_string(),
                String::new(),
                OrderRequest {
                    order_type: OrderType::StopLimit,
                    price: Some(*limit_price),
                    stop_price: Some(*stop_price),
                    time_in_force: Some(TimeInForce::GTC),
                    ..OrderRequest::market(&symbol, *side, *quantity)
                },
            )],
            OrderIntent::SyntheticOco {
                side,
                quantity,
                take_profit_price,
                stop_loss_price,
                ..
            } => {
                let leg_side = match self.oco_leg_side {
                    OcoLegSide::Same => *side,
                    OcoLegSide::Opposite => side.opposite(),
                };
                let base = OrderRequest {
                    reduce_only: true,
                    ..OrderRequest::market(&symbol, leg_side, *quantity)
                };
                vec![
                    (
                        "take-profit".to_string(),
                        "TP".to_string(),
                        OrderRequest {
                            order_type: OrderType::TakeProfitMarket,
                            stop_price: Some(*take_profit_price),
                            ..base.clone()
                        },
                    ),
                    (
                        "stop-loss".to_string(),
                        "SL".to_string(),
                        OrderRequest {
                            order_type: OrderType::StopMarket,
                            stop_price: Some(*stop_loss_price),
                            ..base
                        },
                    ),
                ]
            }
            OrderIntent::Twap {
                side,
                total_quantity,
                duration_secs,
                ..
            } => {
                let chunk = twap_chunk_quantity(*total_quantity);
                spacing = Some(twap_interval(*duration_secs));
                (1..=TWAP_CHUNKS)
                    .map(|i| {
                        (
                            format!("chunk {}/{}", i, TWAP_CHUNKS),
                            format!("C{}", i),
                            OrderRequest::market(&symbol, *side, chunk),
                        )
                    })
                    .collect()
            }
            OrderIntent::Grid {
                side,
                low_price,
                high_price,
                levels,
                quantity_per_level,
                ..
            } => grid_prices(*low_price, *high_price, *levels)
                .into_iter()
                .enumerate()
                .map(|(i, price)| {
                    (
                        format!("level {} @ {}", i + 1, price.normalize()),
                        format!("L{}", i + 1),
                        OrderRequest::limit(&symbol, *side, *quantity_per_level, price),
                    )
                })
                .collect(),
        };

        StrategyPlan {
            kind,
            symbol,
            legs: legs
                .into_iter()
                .map(|(label, tag, request)| PlannedLeg {
                    label,
                    request: request.with_client_order_id(ids.generate_with_tag(&tag)),
                })
                .collect(),
            spacing,
        }
    }

    /// 按顺序逐笔提交，返回每笔的结果
    pub async fn execute(&self, plan: StrategyPlan, submitter: &OrderSubmitter) -> StrategyResult {
        let total = plan.legs.len();
        log::info!(
            "开始执行 {} 策略: {} 共 {} 笔子订单",
            plan.kind,
            plan.symbol,
            total
        );

        let mut legs = Vec::with_capacity(total);
        for (i, leg) in plan.legs.into_iter().enumerate() {
            log::debug!("提交子订单 {}/{}: {}", i + 1, total, leg.label);
            self.audit
                .info(&format!("{} {} ({}/{})", plan.kind, leg.label, i + 1, total));
            let result = submitter.submit(&leg.request).await;
            if !result.is_success() {
                log::warn!("⚠️ 子订单 {} 失败，继续提交后续订单", leg.label);
            }
            legs.push(LegResult {
                label: leg.label,
                request: leg.request,
                result,
            });

            if let Some(spacing) = plan.spacing {
                tokio::time::sleep(spacing).await;
            }
        }

        let result = StrategyResult {
            kind: plan.kind,
            symbol: plan.symbol,
            legs,
        };
        let summary = result.summary();
        if result.failure_count() == 0 {
            self.audit
                .info(&format!("{} Orders Placed: {}", plan.kind, summary));
        } else {
            self.audit
                .error(&format!("{} Orders Partially Placed: {}", plan.kind, summary));
        }
        log::info!("✅ 策略执行完成: {}", summary);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ExchangeError, OrderError};
    use crate::core::types::OrderSide;
    use crate::orders::testing::{FakeGateway, MemoryAudit};
    use crate::utils::unified_logger::LogAudit;
    use rust_decimal_macros::dec;

    fn decomposer() -> StrategyDecomposer {
        StrategyDecomposer::new(OcoLegSide::Same, Arc::new(MemoryAudit::default()))
    }

    fn twap_intent(total: Decimal, duration_secs: u64) -> OrderIntent {
        OrderIntent::Twap {
            symbol: "btcusdt".to_string(),
            side: OrderSide::Buy,
            total_quantity: total,
            duration_secs,
        }
    }

    #[test]
    fn test_twap_chunk_math() {
        assert_eq!(twap_chunk_quantity(dec!(1.0)), dec!(0.1));
        assert_eq!(twap_chunk_quantity(dec!(0.123456789)), dec!(0.01234568));
        assert_eq!(twap_interval(60), Duration::from_secs(6));
        assert_eq!(twap_interval(5), Duration::from_millis(500));
    }

    #[test]
    fn test_grid_prices() {
        assert_eq!(
            grid_prices(dec!(100), dec!(110), 3),
            vec![dec!(100), dec!(105), dec!(110)]
        );
        assert_eq!(
            grid_prices(dec!(100), dec!(101), 4),
            vec![dec!(100), dec!(100.33), dec!(100.67), dec!(101)]
        );
        assert_eq!(
            grid_prices(dec!(100), dec!(101), 2),
            vec![dec!(100.00), dec!(101.00)]
        );
        assert!(grid_prices(dec!(100), dec!(110), 1).is_empty());
        assert_eq!(grid_price_iter(dec!(100), dec!(110), u32::MAX).take(2).count(), 2);
    }

    #[test]
    fn test_plans_from_separate_runs_use_distinct_client_ids() {
        let intent = OrderIntent::Limit {
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Buy,
            quantity: dec!(0.01),
            price: dec!(65000),
        };

        let first = decomposer().plan(&intent);
        let second = decomposer().plan(&intent);

        let first_id = first.legs[0].request.client_order_id.clone().unwrap();
        let second_id = second.legs[0].request.client_order_id.clone().unwrap();
        assert_ne!(first_id, second_id);
        assert!(first_id.starts_with("LMT"));
        assert!(first_id.len() <= 36);
    }

    #[test]
    fn test_plan_single_leg_orders() {
        let plan = decomposer().plan(&OrderIntent::StopLimit {
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Buy,
            quantity: dec!(0.01),
            stop_price: dec!(101),
            limit_price: dec!(100.5),
        });

        assert_eq!(plan.legs.len(), 1);
        assert_eq!(plan.spacing, None);
        let request = &plan.legs[0].request;
        assert_eq!(request.order_type, OrderType::StopLimit);
        assert_eq!(request.price, Some(dec!(100.5)));
        assert_eq!(request.stop_price, Some(dec!(101)));
        assert_eq!(request.time_in_force, Some(TimeInForce::GTC));
        assert!(request
            .client_order_id
            .as_deref()
            .unwrap()
            .starts_with("STP"));
    }

    #[test]
    fn test_plan_oco_leg_order_and_side() {
        let intent = OrderIntent::SyntheticOco {
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Sell,
            quantity: dec!(0.01),
            take_profit_price: dec!(60000),
            stop_loss_price: dec!(70000),
        };

        let plan = decomposer().plan(&intent);
        assert_eq!(plan.legs.len(), 2);

        let tp = &plan.legs[0].request;
        assert_eq!(tp.order_type, OrderType::TakeProfitMarket);
        assert_eq!(tp.stop_price, Some(dec!(60000)));
        assert_eq!(tp.side, OrderSide::Sell);
        assert!(tp.reduce_only);

        let sl = &plan.legs[1].request;
        assert_eq!(sl.order_type, OrderType::StopMarket);
        assert_eq!(sl.stop_price, Some(dec!(70000)));
        assert!(sl.reduce_only);
        assert_ne!(tp.client_order_id, sl.client_order_id);

        let opposite = StrategyDecomposer::new(OcoLegSide::Opposite, Arc::new(LogAudit)).plan(&intent);
        assert!(opposite
            .legs
            .iter()
            .all(|leg| leg.request.side == OrderSide::Buy));
    }

    #[test]
    fn test_plan_grid() {
        let plan = decomposer().plan(&OrderIntent::Grid {
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Buy,
            low_price: dec!(100),
            high_price: dec!(110),
            levels: 3,
            quantity_per_level: dec!(0.002),
        });

        let prices: Vec<_> = plan.legs.iter().map(|l| l.request.price).collect();
        assert_eq!(prices, vec![Some(dec!(100)), Some(dec!(105)), Some(dec!(110))]);
        assert!(plan.legs.iter().all(|l| {
            l.request.order_type == OrderType::Limit
                && l.request.side == OrderSide::Buy
                && l.request.quantity == dec!(0.002)
                && l.request.time_in_force == Some(TimeInForce::GTC)
        }));
        assert_eq!(plan.legs[1].label, "level 2 @ 105");
    }

    #[test]
    fn test_plan_twap_quantities() {
        let plan = decomposer().plan(&twap_intent(dec!(1.0), 60));

        assert_eq!(plan.symbol, "BTCUSDT");
        assert_eq!(plan.legs.len(), TWAP_CHUNKS as usize);
        assert!(plan.legs.iter().all(|l| l.request.quantity == dec!(0.1)));
        assert_eq!(plan.spacing, Some(Duration::from_secs(6)));
        assert_eq!(plan.legs[9].label, "chunk 10/10");
    }

    #[tokio::test(start_paused = true)]
    async fn test_twap_spacing_and_final_sleep() {
        let gateway = Arc::new(FakeGateway::new());
        let submitter = OrderSubmitter::new(gateway.clone(), Arc::new(MemoryAudit::default()));
        let d = decomposer();

        let started = tokio::time::Instant::now();
        let result = d.execute(d.plan(&twap_intent(dec!(1.0), 60)), &submitter).await;

        assert_eq!(result.success_count(), 10);
        // 最后一份之后也会等待一个间隔
        assert_eq!(started.elapsed(), Duration::from_secs(60));

        let times = gateway.submit_times();
        assert_eq!(times.len(), 10);
        for pair in times.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_secs(6));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_twap_continues_after_failure() {
        let gateway = Arc::new(FakeGateway::new().fail_order(
            3,
            ExchangeError::ApiError {
                code: -2019,
                message: "Margin is insufficient.".to_string(),
            },
        ));
        let audit = Arc::new(MemoryAudit::default());
        let submitter = OrderSubmitter::new(gateway.clone(), audit.clone());
        let d = StrategyDecomposer::new(OcoLegSide::Same, audit.clone());

        let result = d.execute(d.plan(&twap_intent(dec!(1.0), 10)), &submitter).await;

        assert_eq!(result.legs.len(), 10);
        assert_eq!(result.failure_count(), 1);
        assert!(!result.legs[3].result.is_success());
        assert!(result.legs[4].result.is_success());
        assert_eq!(gateway.submitted().len(), 10);
        assert!(audit
            .lines()
            .last()
            .unwrap()
            .contains("TWAP Orders Partially Placed"));
    }

    #[tokio::test]
    async fn test_grid_failures_do_not_cancel_siblings() {
        let gateway = Arc::new(
            FakeGateway::new().fail_order(0, ExchangeError::Other("reset".to_string())),
        );
        let submitter = OrderSubmitter::new(gateway.clone(), Arc::new(MemoryAudit::default()));
        let d = decomposer();

        let plan = d.plan(&OrderIntent::Grid {
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Sell,
            low_price: dec!(100),
            high_price: dec!(110),
            levels: 3,
            quantity_per_level: dec!(0.002),
        });
        let result = d.execute(plan, &submitter).await;

        assert_eq!(result.success_count(), 2);
        assert_eq!(result.failure_count(), 1);
        let prices: Vec<_> = gateway.submitted().iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![Some(dec!(100)), Some(dec!(105)), Some(dec!(110))]);
    }

    #[tokio::test]
    async fn test_oco_stop_loss_still_submitted_after_take_profit_fails() {
        let gateway = Arc::new(FakeGateway::new().fail_order(
            0,
            ExchangeError::ApiError {
                code: -2021,
                message: "Order would immediately trigger.".to_string(),
            },
        ));
        let audit = Arc::new(MemoryAudit::default());
        let submitter = OrderSubmitter::new(gateway.clone(), audit.clone());
        let d = decomposer();

        let plan = d.plan(&OrderIntent::SyntheticOco {
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Sell,
            quantity: dec!(0.01),
            take_profit_price: dec!(60000),
            stop_loss_price: dec!(70000),
        });
        let result = d.execute(plan, &submitter).await;

        assert_eq!(result.legs.len(), 2);
        assert_eq!(result.legs[0].label, "take-profit");
        assert_eq!(
            result.legs[0].result.error(),
            Some(&OrderError::ExchangeRejected {
                code: -2021,
                message: "Order would immediately trigger.".to_string(),
            })
        );
        assert_eq!(result.legs[1].label, "stop-loss");
        assert!(result.legs[1].result.is_success());

        let submitted = gateway.submitted();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[1].order_type, OrderType::StopMarket);
        assert!(audit
            .lines()
            .iter()
            .any(|l| l == "ERROR API Error: -2021 - Order would immediately trigger."));
    }
}
