//! 月度计件工资记录

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use oleema_domain_core::{Entity, Money};
use oleema_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::domain::define_id;
use crate::domain::employee::EmployeeId;

define_id!(
    /// 工资记录 ID
    PaymentId
);

/// 结算周期（自然月）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPeriod {
    pub year: i32,
    pub month: u32,
}

impl PaymentPeriod {
    pub fn new(year: i32, month: u32) -> AppResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(AppError::validation("Month must be between 1 and 12"));
        }
        if !(2000..=2100).contains(&year) {
            return Err(AppError::validation("Year must be between 2000 and 2100"));
        }
        Ok(Self { year, month })
    }

    /// 月初
    pub fn first_day(&self) -> AppResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .ok_or_else(|| AppError::validation("Invalid payment period"))
    }

    /// 月末
    pub fn last_day(&self) -> AppResult<NaiveDate> {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| AppError::validation("Invalid payment period"))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

/// 工资记录（每名员工每月一条）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub employee_id: EmployeeId,
    pub period: PaymentPeriod,
    pub total_quantity: i64,
    pub total_amount: Money,
    pub calculated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        employee_id: EmployeeId,
        period: PaymentPeriod,
        total_quantity: i64,
        total_amount: Money,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            employee_id,
            period,
            total_quantity,
            total_amount,
            calculated_at: Utc::now(),
        }
    }
}

impl Entity for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
