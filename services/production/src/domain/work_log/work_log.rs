//! 工作记录实体
//!
//! 一名员工在某一天针对某订单某工序完成的数量。工作记录本身没有状态。

use chrono::{DateTime, NaiveDate, Utc};
use oleema_domain_core::Entity;
use oleema_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::domain::define_id;
use crate::domain::employee::EmployeeId;
use crate::domain::order::OrderId;
use crate::domain::process::ProcessId;

define_id!(
    /// 工作记录 ID
    WorkLogId
);

/// 工作记录实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLog {
    pub id: WorkLogId,
    pub employee_id: EmployeeId,
    pub order_id: OrderId,
    pub process_id: ProcessId,
    pub quantity: i32,
    pub work_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkLog {
    pub fn new(
        employee_id: EmployeeId,
        order_id: OrderId,
        process_id: ProcessId,
        quantity: i32,
        work_date: NaiveDate,
        notes: Option<String>,
    ) -> AppResult<Self> {
        validate_quantity(quantity)?;
        let now = Utc::now();
        Ok(Self {
            id: WorkLogId::new(),
            employee_id,
            order_id,
            process_id,
            quantity,
            work_date,
            notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// 原地修改
    pub fn amend(
        &mut self,
        employee_id: EmployeeId,
        order_id: OrderId,
        process_id: ProcessId,
        quantity: i32,
        work_date: NaiveDate,
        notes: Option<String>,
    ) -> AppResult<()> {
        validate_quantity(quantity)?;
        self.employee_id = employee_id;
        self.order_id = order_id;
        self.process_id = process_id;
        self.quantity = quantity;
        self.work_date = work_date;
        self.notes = notes;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn validate_quantity(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::validation("Quantity must be greater than zero"));
    }
    Ok(())
}

impl Entity for WorkLog {
    type Id = WorkLogId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
