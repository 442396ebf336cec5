//! 工序实体

use chrono::{DateTime, Utc};
use oleema_domain_core::{Entity, Money};
use oleema_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::domain::define_id;

define_id!(
    /// 工序 ID
    ProcessId
);

/// 计件单价上限（最小货币单位）
pub const MAX_PAY_RATE: i64 = 10_000_000;

/// 工序实体（计件单价以最小货币单位存储）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    pub name: String,
    pub pay_rate: Money,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Process {
    pub fn new(name: String, pay_rate: Money, description: Option<String>) -> AppResult<Self> {
        let name = validate(name, pay_rate)?;
        let now = Utc::now();
        Ok(Self {
            id: ProcessId::new(),
            name,
            pay_rate,
            description,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update(
        &mut self,
        name: String,
        pay_rate: Money,
        description: Option<String>,
        is_active: bool,
    ) -> AppResult<()> {
        self.name = validate(name, pay_rate)?;
        self.pay_rate = pay_rate;
        self.description = description;
        self.is_active = is_active;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn validate(name: String, pay_rate: Money) -> AppResult<String> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("Process name cannot be empty"));
    }
    if name.len() > 100 {
        return Err(AppError::validation("Process name cannot exceed 100 characters"));
    }
    if pay_rate.is_negative() {
        return Err(AppError::validation("Pay rate cannot be negative"));
    }
    if pay_rate.amount > MAX_PAY_RATE {
        return Err(AppError::validation(format!(
            "Pay rate cannot exceed {}",
            Money::new(MAX_PAY_RATE)
        )));
    }
    Ok(name)
}

impl Entity for Process {
    type Id = ProcessId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
