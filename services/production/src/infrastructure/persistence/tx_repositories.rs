//! 事务内仓储实现
//!
//! 同一工作单元内的仓储共享一个事务。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use oleema_adapter_postgres::map_sqlx_error;
use oleema_common::Pagination;
use oleema_errors::{AppError, AppResult};
use sqlx::{Postgres, Transaction};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::rows::*;
use crate::domain::employee::{Employee, EmployeeId, EmployeeRepository};
use crate::domain::order::{Order, OrderId, OrderRepository};
use crate::domain::overage::{Overage, OverageContribution, OverageId, OverageRepository};
use crate::domain::payment::{Payment, PaymentPeriod, PaymentRepository};
use crate::domain::process::{Process, ProcessId, ProcessRepository};
use crate::domain::work_log::{WorkLog, WorkLogFilter, WorkLogId, WorkLogRepository};

/// 共享事务
pub type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

macro_rules! define_tx_repo {
    ($name:ident) => {
        pub struct $name {
            tx: SharedTx,
        }

        impl $name {
            pub fn new(tx: SharedTx) -> Self {
                Self { tx }
            }
        }
    };
}

define_tx_repo!(TxOrderRepository);
define_tx_repo!(TxProcessRepository);
define_tx_repo!(TxEmployeeRepository);
define_tx_repo!(TxWorkLogRepository);
define_tx_repo!(TxOverageRepository);
define_tx_repo!(TxPaymentRepository);

fn consumed() -> AppError {
    AppError::internal("Transaction consumed")
}

// -------------------------------------------------------------------------
// 订单
// -------------------------------------------------------------------------

const ORDER_COLUMNS: &str = "id, order_no, order_date, color, size, target_quantity, status, \
                             notes, created_at, updated_at";

#[async_trait]
impl OrderRepository for TxOrderRepository {
    async fn create(&self, order: &Order) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_no, order_date, color, size, target_quantity, status,
                                notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id.0)
        .bind(&order.order_no)
        .bind(order.order_date)
        .bind(&order.color)
        .bind(&order.size)
        .bind(order.target_quantity)
        .bind(order.status.as_str())
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, order: &Order) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query(
            r#"
            UPDATE orders
            SET order_date = $2, color = $3, size = $4, target_quantity = $5, status = $6,
                notes = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(order.id.0)
        .bind(order.order_date)
        .bind(&order.color)
        .bind(&order.size)
        .bind(order.target_quantity)
        .bind(order.status.as_str())
        .bind(&order.notes)
        .bind(order.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, id: &OrderId) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> AppResult<Option<Order>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.0)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        row.map(Order::try_from).transpose()
    }

    async fn lock_by_id(&self, id: &OrderId) -> AppResult<Option<Order>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let sql = format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS);
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.0)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        row.map(Order::try_from).transpose()
    }

    async fn find_by_order_no(&self, order_no: &str) -> AppResult<Option<Order>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let sql = format!("SELECT {} FROM orders WHERE order_no = $1", ORDER_COLUMNS);
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_no)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        row.map(Order::try_from).transpose()
    }

    async fn list(&self, pagination: &Pagination) -> AppResult<(Vec<Order>, u64)> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        let sql = format!(
            "SELECT {} FROM orders ORDER BY order_date DESC, created_at DESC LIMIT $1 OFFSET $2",
            ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(i64::from(pagination.limit()))
            .bind(i64::from(pagination.offset()))
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok((convert_all(rows)?, total.max(0) as u64))
    }
}

// -------------------------------------------------------------------------
// 工序
// -------------------------------------------------------------------------

#[async_trait]
impl ProcessRepository for TxProcessRepository {
    async fn create(&self, process: &Process) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query(
            r#"
            INSERT INTO processes (id, name, pay_rate, description, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(process.id.0)
        .bind(&process.name)
        .bind(process.pay_rate.amount)
        .bind(&process.description)
        .bind(process.is_active)
        .bind(process.created_at)
        .bind(process.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, process: &Process) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query(
            r#"
            UPDATE processes
            SET name = $2, pay_rate = $3, description = $4, is_active = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(process.id.0)
        .bind(&process.name)
        .bind(process.pay_rate.amount)
        .bind(&process.description)
        .bind(process.is_active)
        .bind(process.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, id: &ProcessId) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query("DELETE FROM processes WHERE id = $1")
            .bind(id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &ProcessId) -> AppResult<Option<Process>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let row = sqlx::query_as::<_, ProcessRow>(
            r#"
            SELECT id, name, pay_rate, description, is_active, created_at, updated_at
            FROM processes WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn list(&self, active_only: bool) -> AppResult<Vec<Process>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let rows = sqlx::query_as::<_, ProcessRow>(
            r#"
            SELECT id, name, pay_rate, description, is_active, created_at, updated_at
            FROM processes
            WHERE ($1 = FALSE OR is_active)
            ORDER BY name
            "#,
        )
        .bind(active_only)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// -------------------------------------------------------------------------
// 员工
// -------------------------------------------------------------------------

#[async_trait]
impl EmployeeRepository for TxEmployeeRepository {
    async fn create(&self, employee: &Employee) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query(
            r#"
            INSERT INTO employees (id, code, name, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(employee.id.0)
        .bind(&employee.code)
        .bind(&employee.name)
        .bind(employee.is_active)
        .bind(employee.created_at)
        .bind(employee.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, employee: &Employee) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query("UPDATE employees SET name = $2, is_active = $3, updated_at = $4 WHERE id = $1")
            .bind(employee.id.0)
            .bind(&employee.name)
            .bind(employee.is_active)
            .bind(employee.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, id: &EmployeeId) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &EmployeeId) -> AppResult<Option<Employee>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let row = sqlx::query_as::<_, EmployeeRow>(
            "SELECT id, code, name, is_active, created_at, updated_at FROM employees WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Employee>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let row = sqlx::query_as::<_, EmployeeRow>(
            "SELECT id, code, name, is_active, created_at, updated_at FROM employees WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn list(&self, active_only: bool) -> AppResult<Vec<Employee>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let rows = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, code, name, is_active, created_at, updated_at
            FROM employees
            WHERE ($1 = FALSE OR is_active)
            ORDER BY code
            "#,
        )
        .bind(active_only)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// -------------------------------------------------------------------------
// 工作记录
// -------------------------------------------------------------------------

const WORK_LOG_COLUMNS: &str = "id, employee_id, order_id, process_id, quantity, work_date, \
                                notes, created_at, updated_at";

const WORK_LOG_FILTER: &str = "($1::uuid IS NULL OR employee_id = $1) \
                               AND ($2::uuid IS NULL OR order_id = $2) \
                               AND ($3::uuid IS NULL OR process_id = $3) \
                               AND ($4::date IS NULL OR work_date >= $4) \
                               AND ($5::date IS NULL OR work_date <= $5)";

#[async_trait]
impl WorkLogRepository for TxWorkLogRepository {
    async fn create(&self, log: &WorkLog) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query(
            r#"
            INSERT INTO work_logs (id, employee_id, order_id, process_id, quantity, work_date,
                                   notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(log.id.0)
        .bind(log.employee_id.0)
        .bind(log.order_id.0)
        .bind(log.process_id.0)
        .bind(log.quantity)
        .bind(log.work_date)
        .bind(&log.notes)
        .bind(log.created_at)
        .bind(log.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, log: &WorkLog) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query(
            r#"
            UPDATE work_logs
            SET employee_id = $2, order_id = $3, process_id = $4, quantity = $5, work_date = $6,
                notes = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(log.id.0)
        .bind(log.employee_id.0)
        .bind(log.order_id.0)
        .bind(log.process_id.0)
        .bind(log.quantity)
        .bind(log.work_date)
        .bind(&log.notes)
        .bind(log.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, id: &WorkLogId) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query("DELETE FROM work_logs WHERE id = $1")
            .bind(id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &WorkLogId) -> AppResult<Option<WorkLog>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let sql = format!("SELECT {} FROM work_logs WHERE id = $1", WORK_LOG_COLUMNS);
        let row = sqlx::query_as::<_, WorkLogRow>(&sql)
            .bind(id.0)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn sum_quantity(
        &self,
        order_id: &OrderId,
        process_id: &ProcessId,
        excluding: Option<&WorkLogId>,
    ) -> AppResult<i64> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT
            FROM work_logs
            WHERE order_id = $1 AND process_id = $2 AND ($3::uuid IS NULL OR id <> $3)
            "#,
        )
        .bind(order_id.0)
        .bind(process_id.0)
        .bind(excluding.map(|id| id.0))
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(total)
    }

    async fn count_by_order(&self, order_id: &OrderId) -> AppResult<i64> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query_scalar("SELECT COUNT(*) FROM work_logs WHERE order_id = $1")
            .bind(order_id.0)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn count_by_process(&self, process_id: &ProcessId) -> AppResult<i64> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query_scalar("SELECT COUNT(*) FROM work_logs WHERE process_id = $1")
            .bind(process_id.0)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn count_by_employee(&self, employee_id: &EmployeeId) -> AppResult<i64> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query_scalar("SELECT COUNT(*) FROM work_logs WHERE employee_id = $1")
            .bind(employee_id.0)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_for_pair(
        &self,
        order_id: &OrderId,
        process_id: &ProcessId,
    ) -> AppResult<Vec<WorkLog>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let sql = format!(
            "SELECT {} FROM work_logs WHERE order_id = $1 AND process_id = $2 \
             ORDER BY work_date DESC, created_at DESC, id DESC",
            WORK_LOG_COLUMNS
        );
        let rows = sqlx::query_as::<_, WorkLogRow>(&sql)
            .bind(order_id.0)
            .bind(process_id.0)
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_for_employee_between(
        &self,
        employee_id: &EmployeeId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<WorkLog>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let sql = format!(
            "SELECT {} FROM work_logs WHERE employee_id = $1 AND work_date BETWEEN $2 AND $3 \
             ORDER BY work_date, created_at, id",
            WORK_LOG_COLUMNS
        );
        let rows = sqlx::query_as::<_, WorkLogRow>(&sql)
            .bind(employee_id.0)
            .bind(from)
            .bind(to)
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list(
        &self,
        filter: &WorkLogFilter,
        pagination: &Pagination,
    ) -> AppResult<(Vec<WorkLog>, u64)> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let count_sql = format!("SELECT COUNT(*) FROM work_logs WHERE {}", WORK_LOG_FILTER);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.employee_id.map(|id| id.0))
            .bind(filter.order_id.map(|id| id.0))
            .bind(filter.process_id.map(|id| id.0))
            .bind(filter.from)
            .bind(filter.to)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        let sql = format!(
            "SELECT {} FROM work_logs WHERE {} \
             ORDER BY work_date DESC, created_at DESC, id DESC LIMIT $6 OFFSET $7",
            WORK_LOG_COLUMNS, WORK_LOG_FILTER
        );
        let rows = sqlx::query_as::<_, WorkLogRow>(&sql)
            .bind(filter.employee_id.map(|id| id.0))
            .bind(filter.order_id.map(|id| id.0))
            .bind(filter.process_id.map(|id| id.0))
            .bind(filter.from)
            .bind(filter.to)
            .bind(i64::from(pagination.limit()))
            .bind(i64::from(pagination.offset()))
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok((rows.into_iter().map(Into::into).collect(), total.max(0) as u64))
    }
}

// -------------------------------------------------------------------------
// 超产
// -------------------------------------------------------------------------

const OVERAGE_COLUMNS: &str = "id, order_id, process_id, expected_units, actual_units, \
                               overage_units, status, resolved_by, resolved_at, resolution_notes, \
                               created_at, updated_at";

impl TxOverageRepository {
    /// 删除指定超产记录及其溯源记录
    async fn delete_where(
        tx: &mut Transaction<'static, Postgres>,
        condition: &str,
        param: Vec<Uuid>,
    ) -> AppResult<u64> {
        let children = format!(
            "DELETE FROM work_log_overages WHERE overage_id IN (SELECT id FROM overages WHERE {})",
            condition
        );
        sqlx::query(&children)
            .bind(&param)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        let parents = format!("DELETE FROM overages WHERE {}", condition);
        let result = sqlx::query(&parents)
            .bind(&param)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OverageRepository for TxOverageRepository {
    async fn find_pending(
        &self,
        order_id: &OrderId,
        process_id: &ProcessId,
    ) -> AppResult<Option<Overage>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let sql = format!(
            "SELECT {} FROM overages WHERE order_id = $1 AND process_id = $2 AND status = 'pending'",
            OVERAGE_COLUMNS
        );
        let row = sqlx::query_as::<_, OverageRow>(&sql)
            .bind(order_id.0)
            .bind(process_id.0)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        row.map(Overage::try_from).transpose()
    }

    async fn create(&self, overage: &Overage) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query(
            r#"
            INSERT INTO overages (id, order_id, process_id, expected_units, actual_units,
                                  overage_units, status, resolved_by, resolved_at,
                                  resolution_notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(overage.id.0)
        .bind(overage.order_id.0)
        .bind(overage.process_id.0)
        .bind(overage.expected_units)
        .bind(overage.actual_units)
        .bind(overage.overage_units)
        .bind(overage.status.as_str())
        .bind(&overage.resolved_by)
        .bind(overage.resolved_at)
        .bind(&overage.resolution_notes)
        .bind(overage.created_at)
        .bind(overage.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, overage: &Overage) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query(
            r#"
            UPDATE overages
            SET expected_units = $2, actual_units = $3, overage_units = $4, status = $5,
                resolved_by = $6, resolved_at = $7, resolution_notes = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(overage.id.0)
        .bind(overage.expected_units)
        .bind(overage.actual_units)
        .bind(overage.overage_units)
        .bind(overage.status.as_str())
        .bind(&overage.resolved_by)
        .bind(overage.resolved_at)
        .bind(&overage.resolution_notes)
        .bind(overage.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &OverageId) -> AppResult<Option<Overage>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let sql = format!("SELECT {} FROM overages WHERE id = $1", OVERAGE_COLUMNS);
        let row = sqlx::query_as::<_, OverageRow>(&sql)
            .bind(id.0)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        row.map(Overage::try_from).transpose()
    }

    async fn list_pending(&self) -> AppResult<Vec<Overage>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let sql = format!(
            "SELECT {} FROM overages WHERE status = 'pending' ORDER BY created_at DESC",
            OVERAGE_COLUMNS
        );
        let rows = sqlx::query_as::<_, OverageRow>(&sql)
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        convert_all(rows)
    }

    async fn list_resolved_since(&self, since: DateTime<Utc>) -> AppResult<Vec<Overage>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let sql = format!(
            "SELECT {} FROM overages WHERE status = 'resolved' AND resolved_at >= $1 \
             ORDER BY resolved_at DESC",
            OVERAGE_COLUMNS
        );
        let rows = sqlx::query_as::<_, OverageRow>(&sql)
            .bind(since)
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        convert_all(rows)
    }

    async fn delete_by_order(&self, order_id: &OrderId) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        Self::delete_where(tx, "order_id = ANY($1)", vec![order_id.0]).await
    }

    async fn delete_by_process(&self, process_id: &ProcessId) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        Self::delete_where(tx, "process_id = ANY($1)", vec![process_id.0]).await
    }

    async fn add_contribution(&self, contribution: &OverageContribution) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query(
            r#"
            INSERT INTO work_log_overages (overage_id, work_log_id, units, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(contribution.overage_id.0)
        .bind(contribution.work_log_id.0)
        .bind(contribution.units)
        .bind(contribution.created_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_contributions(
        &self,
        overage_id: &OverageId,
    ) -> AppResult<Vec<OverageContribution>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let rows = sqlx::query_as::<_, ContributionRow>(
            r#"
            SELECT overage_id, work_log_id, units, created_at
            FROM work_log_overages
            WHERE overage_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(overage_id.0)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_contributions_for_work_log(&self, work_log_id: &WorkLogId) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let result = sqlx::query("DELETE FROM work_log_overages WHERE work_log_id = $1")
            .bind(work_log_id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn find_orphans(&self) -> AppResult<Vec<Overage>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let rows = sqlx::query_as::<_, OverageRow>(
            r#"
            SELECT ov.id, ov.order_id, ov.process_id, ov.expected_units, ov.actual_units,
                   ov.overage_units, ov.status, ov.resolved_by, ov.resolved_at,
                   ov.resolution_notes, ov.created_at, ov.updated_at
            FROM overages ov
            LEFT JOIN orders o ON o.id = ov.order_id
            LEFT JOIN processes p ON p.id = ov.process_id
            WHERE o.id IS NULL OR p.id IS NULL
            ORDER BY ov.created_at
            "#,
        )
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        convert_all(rows)
    }

    async fn delete_by_ids(&self, ids: &[OverageId]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let ids: Vec<Uuid> = ids.iter().map(|id| id.0).collect();
        Self::delete_where(tx, "id = ANY($1)", ids).await
    }
}

// -------------------------------------------------------------------------
// 工资
// -------------------------------------------------------------------------

#[async_trait]
impl PaymentRepository for TxPaymentRepository {
    async fn upsert(&self, payment: &Payment) -> AppResult<Payment> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            INSERT INTO payments (id, employee_id, year, month, total_quantity, total_amount,
                                  calculated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (employee_id, year, month) DO UPDATE
            SET total_quantity = EXCLUDED.total_quantity,
                total_amount = EXCLUDED.total_amount,
                calculated_at = EXCLUDED.calculated_at
            RETURNING id, employee_id, year, month, total_quantity, total_amount, calculated_at
            "#,
        )
        .bind(payment.id.0)
        .bind(payment.employee_id.0)
        .bind(payment.period.year)
        .bind(payment.period.month as i32)
        .bind(payment.total_quantity)
        .bind(payment.total_amount.amount)
        .bind(payment.calculated_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Payment::try_from(row)
    }

    async fn find(
        &self,
        employee_id: &EmployeeId,
        period: &PaymentPeriod,
    ) -> AppResult<Option<Payment>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, employee_id, year, month, total_quantity, total_amount, calculated_at
            FROM payments
            WHERE employee_id = $1 AND year = $2 AND month = $3
            "#,
        )
        .bind(employee_id.0)
        .bind(period.year)
        .bind(period.month as i32)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        row.map(Payment::try_from).transpose()
    }

    async fn count_by_employee(&self, employee_id: &EmployeeId) -> AppResult<i64> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE employee_id = $1")
            .bind(employee_id.0)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)
    }
}
