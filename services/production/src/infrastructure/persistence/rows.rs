//! 数据库行结构与领域对象转换

use chrono::{DateTime, NaiveDate, Utc};
use oleema_domain_core::Money;
use oleema_errors::{AppError, AppResult};
use uuid::Uuid;

use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::order::{Order, OrderId};
use crate::domain::overage::{Overage, OverageContribution, OverageId};
use crate::domain::payment::{Payment, PaymentId, PaymentPeriod};
use crate::domain::process::{Process, ProcessId};
use crate::domain::work_log::{WorkLog, WorkLogId};

#[derive(sqlx::FromRow)]
pub(super) struct OrderRow {
    id: Uuid,
    order_no: String,
    order_date: NaiveDate,
    color: Option<String>,
    size: Option<String>,
    target_quantity: i32,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> AppResult<Self> {
        Ok(Self {
            id: OrderId::from_uuid(row.id),
            order_no: row.order_no,
            order_date: row.order_date,
            color: row.color,
            size: row.size,
            target_quantity: row.target_quantity,
            status: row
                .status
                .parse()
                .map_err(|_| AppError::internal(format!("Unknown order status '{}'", row.status)))?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct ProcessRow {
    id: Uuid,
    name: String,
    pay_rate: i64,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProcessRow> for Process {
    fn from(row: ProcessRow) -> Self {
        Self {
            id: ProcessId::from_uuid(row.id),
            name: row.name,
            pay_rate: Money::new(row.pay_rate),
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct EmployeeRow {
    id: Uuid,
    code: String,
    name: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Self {
            id: EmployeeId::from_uuid(row.id),
            code: row.code,
            name: row.name,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct WorkLogRow {
    id: Uuid,
    employee_id: Uuid,
    order_id: Uuid,
    process_id: Uuid,
    quantity: i32,
    work_date: NaiveDate,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WorkLogRow> for WorkLog {
    fn from(row: WorkLogRow) -> Self {
        Self {
            id: WorkLogId::from_uuid(row.id),
            employee_id: EmployeeId::from_uuid(row.employee_id),
            order_id: OrderId::from_uuid(row.order_id),
            process_id: ProcessId::from_uuid(row.process_id),
            quantity: row.quantity,
            work_date: row.work_date,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct OverageRow {
    id: Uuid,
    order_id: Uuid,
    process_id: Uuid,
    expected_units: i64,
    actual_units: i64,
    overage_units: i64,
    status: String,
    resolved_by: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
    resolution_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OverageRow> for Overage {
    type Error = AppError;

    fn try_from(row: OverageRow) -> AppResult<Self> {
        Ok(Self {
            id: OverageId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            process_id: ProcessId::from_uuid(row.process_id),
            expected_units: row.expected_units,
            actual_units: row.actual_units,
            overage_units: row.overage_units,
            status: row.status.parse()?,
            resolved_by: row.resolved_by,
            resolved_at: row.resolved_at,
            resolution_notes: row.resolution_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct ContributionRow {
    overage_id: Uuid,
    work_log_id: Uuid,
    units: i64,
    created_at: DateTime<Utc>,
}

impl From<ContributionRow> for OverageContribution {
    fn from(row: ContributionRow) -> Self {
        Self {
            overage_id: OverageId::from_uuid(row.overage_id),
            work_log_id: WorkLogId::from_uuid(row.work_log_id),
            units: row.units,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct PaymentRow {
    id: Uuid,
    employee_id: Uuid,
    year: i32,
    month: i32,
    total_quantity: i64,
    total_amount: i64,
    calculated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> AppResult<Self> {
        let month = u32::try_from(row.month)
            .map_err(|_| AppError::internal(format!("Invalid payment month {}", row.month)))?;
        Ok(Self {
            id: PaymentId::from_uuid(row.id),
            employee_id: EmployeeId::from_uuid(row.employee_id),
            period: PaymentPeriod::new(row.year, month)?,
            total_quantity: row.total_quantity,
            total_amount: Money::new(row.total_amount),
            calculated_at: row.calculated_at,
        })
    }
}

/// 批量转换
pub(super) fn convert_all<R, T>(rows: Vec<R>) -> AppResult<Vec<T>>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}
