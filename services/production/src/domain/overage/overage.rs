//! 超产记录实体
//!
//! 每个 (订单, 工序) 至多一条 pending 记录；后续超产在原记录上更新。
//! 只有人工处理才能转为 resolved。

use chrono::{DateTime, Utc};
use oleema_domain_core::Entity;
use oleema_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::domain::define_id;
use crate::domain::order::OrderId;
use crate::domain::process::ProcessId;
use crate::domain::work_log::WorkLogId;

define_id!(
    /// 超产记录 ID
    OverageId
);

/// 超产状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverageStatus {
    Pending,
    Resolved,
}

impl OverageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for OverageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OverageStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "resolved" => Ok(Self::Resolved),
            other => Err(AppError::internal(format!("Unknown overage status '{}'", other))),
        }
    }
}

/// 超产记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overage {
    pub id: OverageId,
    pub order_id: OrderId,
    pub process_id: ProcessId,
    /// 检测时订单目标数量快照
    pub expected_units: i64,
    /// 该订单工序的累计登记数量
    pub actual_units: i64,
    pub overage_units: i64,
    pub status: OverageStatus,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Overage {
    /// 新检测到的超产
    pub fn detect(
        order_id: OrderId,
        process_id: ProcessId,
        expected_units: i64,
        actual_units: i64,
    ) -> AppResult<Self> {
        let overage_units = positive_overage(expected_units, actual_units)?;
        let now = Utc::now();
        Ok(Self {
            id: OverageId::new(),
            order_id,
            process_id,
            expected_units,
            actual_units,
            overage_units,
            status: OverageStatus::Pending,
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == OverageStatus::Pending
    }

    /// 以最新总量刷新 pending 记录，返回刷新前的超产数量
    pub fn refresh(&mut self, expected_units: i64, actual_units: i64) -> AppResult<i64> {
        if !self.is_pending() {
            return Err(AppError::invalid_state(format!(
                "Overage {} is already resolved",
                self.id
            )));
        }
        let overage_units = positive_overage(expected_units, actual_units)?;
        let previous = self.overage_units;
        self.expected_units = expected_units;
        self.actual_units = actual_units;
        self.overage_units = overage_units;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    /// 人工处理
    pub fn resolve(&mut self, resolver: &str, notes: &str, at: DateTime<Utc>) -> AppResult<()> {
        if !self.is_pending() {
            return Err(AppError::invalid_state(format!(
                "Overage {} is already resolved",
                self.id
            )));
        }
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(AppError::validation("Resolution notes are required"));
        }
        let resolver = resolver.trim();
        if resolver.is_empty() {
            return Err(AppError::validation("Resolver is required"));
        }
        self.status = OverageStatus::Resolved;
        self.resolved_by = Some(resolver.to_string());
        self.resolved_at = Some(at);
        self.resolution_notes = Some(notes.to_string());
        self.updated_at = at;
        Ok(())
    }
}

fn positive_overage(expected_units: i64, actual_units: i64) -> AppResult<i64> {
    let overage_units = actual_units - expected_units;
    if overage_units <= 0 {
        return Err(AppError::internal(format!(
            "Overage requires actual units ({}) above expected units ({})",
            actual_units, expected_units
        )));
    }
    Ok(overage_units)
}

impl Entity for Overage {
    type Id = OverageId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// 工作记录对超产的贡献（处理溯源）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverageContribution {
    pub overage_id: OverageId,
    pub work_log_id: WorkLogId,
    /// 该记录带来的超产数量增量
    pub units: i64,
    pub created_at: DateTime<Utc>,
}

impl OverageContribution {
    pub fn new(overage_id: OverageId, work_log_id: WorkLogId, units: i64) -> Self {
        Self {
            overage_id,
            work_log_id,
            units,
            created_at: Utc::now(),
        }
    }
}
