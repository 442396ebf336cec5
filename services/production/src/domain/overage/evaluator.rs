//! 超产判定
//!
//! 纯计算：给定订单目标数量、已登记总量和拟登记数量，判断是否超出目标。
//! 目标数量为 0 时，任何正数量都视为超产。

use serde::{Deserialize, Serialize};

use crate::domain::order::{Order, OrderId};
use crate::domain::process::{Process, ProcessId};

/// 判定结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverageEvaluation {
    pub order_id: OrderId,
    pub process_id: ProcessId,
    pub order_no: String,
    pub process_name: String,
    pub target_quantity: i64,
    pub existing_total: i64,
    pub proposed_quantity: i64,
    pub new_total: i64,
    pub exceeds: bool,
    pub overage_units: i64,
}

impl OverageEvaluation {
    /// 面向用户的超产说明
    pub fn message(&self) -> String {
        format!(
            "Order {} / {}: {} already logged + {} proposed = {} against a target of {} ({} over)",
            self.order_no,
            self.process_name,
            self.existing_total,
            self.proposed_quantity,
            self.new_total,
            self.target_quantity,
            self.overage_units
        )
    }
}

/// 判定某订单某工序再登记 `proposed_quantity` 后是否超产
///
/// `existing_total` 为该订单工序当前已登记的总量；编辑时需排除被编辑的记录。
pub fn evaluate(
    order: &Order,
    process: &Process,
    existing_total: i64,
    proposed_quantity: i32,
) -> OverageEvaluation {
    let target = i64::from(order.target_quantity);
    let proposed = i64::from(proposed_quantity);
    let (new_total, exceeds, overage_units) = compute(target, existing_total, proposed);

    OverageEvaluation {
        order_id: order.id,
        process_id: process.id,
        order_no: order.order_no.clone(),
        process_name: process.name.clone(),
        target_quantity: target,
        existing_total,
        proposed_quantity: proposed,
        new_total,
        exceeds,
        overage_units,
    }
}

fn compute(target: i64, existing_total: i64, proposed: i64) -> (i64, bool, i64) {
    let new_total = existing_total + proposed;
    let exceeds = new_total > target;
    let overage_units = (new_total - target).max(0);
    (new_total, exceeds, overage_units)
}
