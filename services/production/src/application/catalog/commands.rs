//! 基础资料命令定义

use chrono::NaiveDate;
use oleema_domain_core::Money;
use serde::Deserialize;

use crate::domain::order::OrderStatus;

/// 创建订单命令
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderCommand {
    pub order_no: String,
    pub order_date: NaiveDate,
    pub target_quantity: i32,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// 更新订单命令（订单号不可修改）
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderCommand {
    pub order_date: NaiveDate,
    pub target_quantity: i32,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// 显式状态变更
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// 创建或更新工序命令
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessCommand {
    pub name: String,
    /// 计件单价（最小货币单位）
    pub pay_rate: Money,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// 创建员工命令
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEmployeeCommand {
    pub code: String,
    pub name: String,
}

/// 更新员工命令
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEmployeeCommand {
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// 空白字符串视为未填写
pub(super) fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
