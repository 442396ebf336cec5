//! 货币值对象
//!
//! 只支持单一计价单位，金额以最小单位（如分）存储。
//! 算术一律走 checked 版本，溢出由调用方决定如何报错。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 金额值对象
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    /// 金额（以最小单位存储，如分）
    pub amount: i64,
}

impl Money {
    pub fn new(amount: i64) -> Self {
        Self { amount }
    }

    pub fn zero() -> Self {
        Self { amount: 0 }
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.amount.checked_add(other.amount).map(Self::new)
    }

    /// 单价 × 数量
    pub fn checked_mul(self, quantity: i64) -> Option<Self> {
        self.amount.checked_mul(quantity).map(Self::new)
    }

    /// 求和，任一步溢出返回 None
    pub fn checked_sum<I: IntoIterator<Item = Self>>(items: I) -> Option<Self> {
        items
            .into_iter()
            .try_fold(Self::zero(), |acc, item| acc.checked_add(item))
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn is_negative(&self) -> bool {
        self.amount < 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}
