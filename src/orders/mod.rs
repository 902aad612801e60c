// 下单核心 - 交易规则、意图校验、策略分解与提交
pub mod decomposer;
pub mod engine;
pub mod intent;
pub mod result;
pub mod rules;
pub mod submitter;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use decomposer::{StrategyDecomposer, StrategyPlan, PlannedLeg};
pub use engine::OrderEngine;
pub use intent::{OrderIntent, StrategyKind};
pub use result::{LegResult, StrategyResult, SubmissionResult};
pub use rules::{ExchangeRuleCache, ExchangeRuleSet, RuleSnapshot, SymbolRule};
pub use submitter::OrderSubmitter;
pub use validator::{OrderValidator, Rejection, ValidationOutcome};
