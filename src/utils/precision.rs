//! 定点精度工具
//!
//! 步长/最小变动价位的整除判断在 10^-8 整数格点上完成，避免浮点取模的误判。

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// 格点精度（小数位）
pub const LATTICE_DECIMALS: u32 = 8;

/// 把数值映射到 10^-8 格点上的整数；不在格点上（小数超过 8 位）或溢出时返回 None
pub fn to_lattice(value: Decimal) -> Option<i128> {
    let scale = Decimal::from(10i64.pow(LATTICE_DECIMALS));
    let scaled = value.checked_mul(scale)?;
    if !scaled.fract().is_zero() {
        return None;
    }
    scaled.trunc().to_i128()
}

/// value 是否为 step 的整数倍
pub fn is_multiple_of(value: Decimal, step: Decimal) -> bool {
    if step <= Decimal::ZERO {
        return false;
    }

    match to_lattice(step) {
        Some(step_units) if step_units > 0 => match to_lattice(value) {
            Some(value_units) => value_units % step_units == 0,
            None => false,
        },
        // 步长比格点还细，退回精确十进制取余
        _ => (value % step).is_zero(),
    }
}

/// 四舍六入五成双到指定小数位
pub fn round_to(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp(decimals)
}
