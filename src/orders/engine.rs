use std::sync::Arc;

use crate::core::config::OrderSettings;
use crate::core::error::OrderError;
use crate::core::exchange::ExchangeGateway;
use crate::orders::decomposer::{StrategyDecomposer, StrategyPlan};
use crate::orders::intent::OrderIntent;
use crate::orders::result::StrategyResult;
use crate::orders::rules::{ExchangeRuleCache, RuleSnapshot};
use crate::orders::submitter::OrderSubmitter;
use crate::orders::validator::{OrderValidator, ValidationOutcome};
use crate::utils::unified_logger::AuditLog;

/// 下单引擎：校验 -> 分解 -> 顺序提交
///
/// 规则快照在构造时确定，整个进程生命周期内不变。
pub struct OrderEngine {
    rules: RuleSnapshot,
    decomposer: StrategyDecomposer,
    submitter: OrderSubmitter,
}

impl OrderEngine {
    pub fn new(rules: RuleSnapshot, decomposer: StrategyDecomposer, submitter: OrderSubmitter) -> Self {
        Self {
            rules,
            decomposer,
            submitter,
        }
    }

    /// 拉取一次交易规则并组装引擎
    pub async fn bootstrap(
        gateway: Arc<dyn ExchangeGateway>,
        audit: Arc<dyn AuditLog>,
        settings: &OrderSettings,
    ) -> Self {
        let rules = ExchangeRuleCache::new(gateway.clone()).fetch().await;
        Self::new(
            rules,
            StrategyDecomposer::new(settings.oco_leg_side, audit.clone()),
            OrderSubmitter::new(gateway, audit),
        )
    }

    pub fn rules(&self) -> &RuleSnapshot {
        &self.rules
    }

    pub fn validate(&self, intent: &OrderIntent) -> ValidationOutcome {
        OrderValidator::validate(intent, &self.rules)
    }

    /// 校验并生成执行计划，不提交
    pub fn prepare(&self, intent: &OrderIntent) -> Result<StrategyPlan, OrderError> {
        let outcome = self.validate(intent);
        match &outcome {
            ValidationOutcome::Valid => {}
            ValidationOutcome::Invalid(rejection) => self.submitter.audit().error(&format!(
                "Invalid {} Order Input: {}",
                intent.kind(),
                rejection.reason
            )),
            ValidationOutcome::Unavailable => self
                .submitter
                .audit()
                .error(&format!("Order Error: {}", OrderError::RuleUnavailable)),
        }
        outcome.into_result()?;
        Ok(self.decomposer.plan(intent))
    }

    /// 下单；校验失败时不会发出任何请求
    pub async fn place(&self, intent: &OrderIntent) -> Result<StrategyResult, OrderError> {
        let plan = self.prepare(intent)?;
        Ok(self.decomposer.execute(plan, &self.submitter).await)
    }
}
