//! 订单实体

use chrono::{DateTime, NaiveDate, Utc};
use oleema_domain_core::Entity;
use oleema_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::domain::define_id;

define_id!(
    /// 订单 ID
    OrderId
);

/// 订单状态
///
/// pending → in_progress → completed，pending / in_progress 可取消。
/// completed 与 cancelled 为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// 是否允许迁移到目标状态
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (InProgress, Completed)
                | (Pending, Cancelled)
                | (InProgress, Cancelled)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(AppError::validation(format!("Unknown order status '{}'", other))),
        }
    }
}

/// 订单实体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// 订单号（业务主键，创建后不可修改）
    pub order_no: String,
    pub order_date: NaiveDate,
    pub color: Option<String>,
    pub size: Option<String>,
    /// 目标数量
    pub target_quantity: i32,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        order_no: String,
        order_date: NaiveDate,
        target_quantity: i32,
        color: Option<String>,
        size: Option<String>,
        notes: Option<String>,
    ) -> AppResult<Self> {
        let order_no = order_no.trim().to_string();
        if order_no.is_empty() {
            return Err(AppError::validation("Order number cannot be empty"));
        }
        if order_no.len() > 50 {
            return Err(AppError::validation("Order number cannot exceed 50 characters"));
        }
        validate_target(target_quantity)?;

        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            order_no,
            order_date,
            color,
            size,
            target_quantity,
            status: OrderStatus::Pending,
            notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// 更新可变字段（订单号除外）
    pub fn update_details(
        &mut self,
        order_date: NaiveDate,
        target_quantity: i32,
        color: Option<String>,
        size: Option<String>,
        notes: Option<String>,
    ) -> AppResult<()> {
        validate_target(target_quantity)?;
        self.order_date = order_date;
        self.target_quantity = target_quantity;
        self.color = color;
        self.size = size;
        self.notes = notes;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 显式状态变更
    pub fn transition_to(&mut self, next: OrderStatus) -> AppResult<()> {
        if self.status == next {
            return Ok(());
        }
        if !self.status.can_transition_to(next) {
            return Err(AppError::invalid_state(format!(
                "Order {} cannot move from {} to {}",
                self.order_no, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 首次登记工作记录时 pending → in_progress
    ///
    /// 返回是否发生了状态变化
    pub fn mark_started(&mut self) -> bool {
        if self.status != OrderStatus::Pending {
            return false;
        }
        self.status = OrderStatus::InProgress;
        self.updated_at = Utc::now();
        true
    }
}

fn validate_target(target_quantity: i32) -> AppResult<()> {
    if target_quantity <= 0 {
        return Err(AppError::validation("Target quantity must be greater than zero"));
    }
    Ok(())
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
