//! 工作记录表单解析
//!
//! 表单字段以宽松的字符串形式到达，在进入超产判定之前转换为强类型提交。

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::domain::employee::EmployeeId;
use crate::domain::order::OrderId;
use crate::domain::process::ProcessId;

const MAX_NOTES_LEN: usize = 500;

/// 原始表单
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkLogForm {
    #[serde(default, deserialize_with = "lenient_string")]
    pub employee_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub process_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quantity: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub work_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: Option<String>,
}

/// 校验后的提交
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkLogSubmission {
    pub employee_id: EmployeeId,
    pub order_id: OrderId,
    pub process_id: ProcessId,
    pub quantity: i32,
    pub work_date: NaiveDate,
    pub notes: Option<String>,
}

/// 字段错误（字段名 → 说明）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[error("{} field(s) failed validation", .0.len())]
#[serde(transparent)]
pub struct FieldErrors(pub BTreeMap<String, String>);

impl FieldErrors {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }
}

/// 待审提交的处理动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagedAction {
    Approve,
    Edit,
    Cancel,
}

impl WorkLogForm {
    /// 解析为强类型提交，收集全部字段错误
    pub fn parse(self) -> Result<WorkLogSubmission, FieldErrors> {
        let mut errors = FieldErrors::default();

        let employee_id = parse_id::<EmployeeId>(&mut errors, "employee_id", self.employee_id);
        let order_id = parse_id::<OrderId>(&mut errors, "order_id", self.order_id);
        let process_id = parse_id::<ProcessId>(&mut errors, "process_id", self.process_id);

        let quantity = match non_empty(self.quantity) {
            None => {
                errors.add("quantity", "Quantity is required");
                None
            }
            Some(raw) => match raw.parse::<i32>() {
                Ok(q) if q > 0 => Some(q),
                Ok(_) => {
                    errors.add("quantity", "Quantity must be greater than zero");
                    None
                }
                Err(_) => {
                    errors.add("quantity", "Quantity must be a whole number");
                    None
                }
            },
        };

        let work_date = match non_empty(self.work_date) {
            None => {
                errors.add("work_date", "Date is required");
                None
            }
            Some(raw) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
                Ok(d) => Some(d),
                Err(_) => {
                    errors.add("work_date", "Date must be in YYYY-MM-DD format");
                    None
                }
            },
        };

        let notes = non_empty(self.notes);
        if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
            errors.add("notes", format!("Notes cannot exceed {} characters", MAX_NOTES_LEN));
        }

        match (employee_id, order_id, process_id, quantity, work_date) {
            (Some(employee_id), Some(order_id), Some(process_id), Some(quantity), Some(work_date))
                if errors.is_empty() =>
            {
                Ok(WorkLogSubmission {
                    employee_id,
                    order_id,
                    process_id,
                    quantity,
                    work_date,
                    notes,
                })
            }
            _ => Err(errors),
        }
    }
}

impl From<&WorkLogSubmission> for WorkLogForm {
    /// 回填到录入表单
    fn from(s: &WorkLogSubmission) -> Self {
        Self {
            employee_id: Some(s.employee_id.to_string()),
            order_id: Some(s.order_id.to_string()),
            process_id: Some(s.process_id.to_string()),
            quantity: Some(s.quantity.to_string()),
            work_date: Some(s.work_date.format("%Y-%m-%d").to_string()),
            notes: s.notes.clone(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_id<T: std::str::FromStr>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
) -> Option<T> {
    match non_empty(value) {
        None => {
            errors.add(field, "This field is required");
            None
        }
        Some(raw) => match raw.parse::<T>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add(field, "Invalid identifier");
                None
            }
        },
    }
}

/// 接受字符串、数字或 null
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn valid_form() -> WorkLogForm {
        WorkLogForm {
            employee_id: Some(Uuid::now_v7().to_string()),
            order_id: Some(Uuid::now_v7().to_string()),
            process_id: Some(Uuid::now_v7().to_string()),
            quantity: Some("25".to_string()),
            work_date: Some("2024-05-02".to_string()),
            notes: Some("  night shift ".to_string()),
        }
    }

    #[test]
    fn test_parse_valid_form() {
        let submission = valid_form().parse().unwrap();
        assert_eq!(submission.quantity, 25);
        assert_eq!(submission.work_date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(submission.notes.as_deref(), Some("night shift"));
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let errors = WorkLogForm::default().parse().unwrap_err();
        for field in ["employee_id", "order_id", "process_id", "quantity", "work_date"] {
            assert!(errors.get(field).is_some(), "missing error for {}", field);
        }
        assert!(errors.get("notes").is_none());
    }

    #[test]
    fn test_quantity_must_be_positive_integer() {
        for raw in ["0", "-3", "2.5", "ten"] {
            let form = WorkLogForm {
                quantity: Some(raw.to_string()),
                ..valid_form()
            };
            let errors = form.parse().unwrap_err();
            assert!(errors.get("quantity").is_some(), "accepted {}", raw);
        }
    }

    #[test]
    fn test_bad_date_and_id() {
        let form = WorkLogForm {
            work_date: Some("02/05/2024".to_string()),
            order_id: Some("PO-1".to_string()),
            ..valid_form()
        };
        let errors = form.parse().unwrap_err();
        assert_eq!(errors.0.len(), 2);
        assert_eq!(errors.get("order_id"), Some("Invalid identifier"));
    }

    #[test]
    fn test_blank_notes_become_none() {
        let form = WorkLogForm {
            notes: Some("   ".to_string()),
            ..valid_form()
        };
        assert!(form.parse().unwrap().notes.is_none());
    }

    #[test]
    fn test_json_numbers_are_accepted() {
        let json = serde_json::json!({
            "employee_id": Uuid::now_v7().to_string(),
            "order_id": Uuid::now_v7().to_string(),
            "process_id": Uuid::now_v7().to_string(),
            "quantity": 12,
            "work_date": "2024-01-31",
            "notes": null
        });
        let form: WorkLogForm = serde_json::from_value(json).unwrap();
        assert_eq!(form.parse().unwrap().quantity, 12);
    }

    #[test]
    fn test_action_deserialize() {
        let action: StagedAction = serde_json::from_str("\"approve\"").unwrap();
        assert_eq!(action, StagedAction::Approve);
        assert!(serde_json::from_str::<StagedAction>("\"maybe\"").is_err());
    }
}
