//! 员工实体

use chrono::{DateTime, Utc};
use oleema_domain_core::Entity;
use oleema_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::domain::define_id;

define_id!(
    /// 员工 ID
    EmployeeId
);

/// 员工实体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    /// 员工编号（唯一）
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn new(code: String, name: String) -> AppResult<Self> {
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(AppError::validation("Employee code cannot be empty"));
        }
        if code.len() > 20 {
            return Err(AppError::validation("Employee code cannot exceed 20 characters"));
        }
        let name = validate_name(name)?;
        let now = Utc::now();
        Ok(Self {
            id: EmployeeId::new(),
            code,
            name,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update(&mut self, name: String, is_active: bool) -> AppResult<()> {
        self.name = validate_name(name)?;
        self.is_active = is_active;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn validate_name(name: String) -> AppResult<String> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("Employee name cannot be empty"));
    }
    Ok(name)
}

impl Entity for Employee {
    type Id = EmployeeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
