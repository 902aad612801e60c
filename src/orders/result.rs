use serde::Serialize;

use crate::core::error::OrderError;
use crate::core::types::{OrderAck, OrderRequest};
use crate::orders::intent::StrategyKind;

/// 单笔原子订单的提交结果
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    Success(OrderAck),
    Failure(OrderError),
}

impl SubmissionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionResult::Success(_))
    }

    pub fn error(&self) -> Option<&OrderError> {
        match self {
            SubmissionResult::Success(_) => None,
            SubmissionResult::Failure(err) => Some(err),
        }
    }
}

/// 策略中一条子订单及其结果
#[derive(Debug, Clone)]
pub struct LegResult {
    /// 例如 "chunk 3/10"、"take-profit"、"level 2 @ 105"
    pub label: String,
    pub request: OrderRequest,
    pub result: SubmissionResult,
}

/// 一次策略执行的汇总，子订单按提交顺序排列
#[derive(Debug, Clone)]
pub struct StrategyResult {
    pub kind: StrategyKind,
    pub symbol: String,
    pub legs: Vec<LegResult>,
}

impl StrategyResult {
    pub fn success_count(&self) -> usize {
        self.legs.iter().filter(|leg| leg.result.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.legs.len() - self.success_count()
    }

    pub fn all_succeeded(&self) -> bool {
        !self.legs.is_empty() && self.failure_count() == 0
    }

    /// 用于 CLI 输出的摘要
    pub fn summary(&self) -> StrategySummary {
        StrategySummary {
            strategy: self.kind.label().to_string(),
            symbol: self.symbol.clone(),
            submitted: self.legs.len(),
            succeeded: self.success_count(),
            failed: self.failure_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategySummary {
    pub strategy: String,
    pub symbol: String,
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl std::fmt::Display for StrategySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {}: {} submitted, {} succeeded, {} failed",
            self.strategy, self.symbol, self.submitted, self.succeeded, self.failed
        )
    }
}
