// 工具模块 - 签名、精度、订单ID和日志
pub mod order_id;
pub mod precision;
pub mod signature;
pub mod unified_logger;

pub use order_id::{OrderIdGenerator, OrderIdInfo};
pub use precision::{is_multiple_of, round_to};
pub use signature::*;
