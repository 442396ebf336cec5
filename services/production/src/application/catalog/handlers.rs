//! 基础资料命令处理器
//!
//! 删除订单或工序前先检查工作记录引用，再在同一工作单元内级联清理超产记录。

use std::sync::Arc;

use oleema_common::{PagedResult, Pagination};
use oleema_errors::{AppError, AppResult};
use tracing::{info, instrument};

use super::commands::*;
use crate::application::overage::{cascade_delete_for_order, cascade_delete_for_process};
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::order::{Order, OrderId};
use crate::domain::process::{Process, ProcessId};
use crate::domain::unit_of_work::UnitOfWorkFactory;

/// 基础资料命令处理器
pub struct CatalogCommandHandler {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
}

impl CatalogCommandHandler {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow_factory }
    }

    // ---------------------------------------------------------------------
    // 订单
    // ---------------------------------------------------------------------

    /// 创建订单
    #[instrument(skip(self, cmd), fields(order_no = %cmd.order_no))]
    pub async fn create_order(&self, cmd: CreateOrderCommand) -> AppResult<Order> {
        let order = Order::new(
            cmd.order_no,
            cmd.order_date,
            cmd.target_quantity,
            blank_to_none(cmd.color),
            blank_to_none(cmd.size),
            blank_to_none(cmd.notes),
        )?;

        let uow = self.uow_factory.begin().await?;
        if uow
            .orders()
            .find_by_order_no(&order.order_no)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "Order number '{}' already exists",
                order.order_no
            )));
        }
        uow.orders().create(&order).await?;
        uow.commit().await?;

        info!(order_id = %order.id, "Order created");
        Ok(order)
    }

    /// 更新订单
    #[instrument(skip(self, cmd), fields(order_id = %id))]
    pub async fn update_order(&self, id: &OrderId, cmd: UpdateOrderCommand) -> AppResult<Order> {
        let uow = self.uow_factory.begin().await?;
        let mut order = uow
            .orders()
            .lock_by_id(id)
            .await?
            .ok_or_else(|| order_not_found(id))?;

        order.update_details(
            cmd.order_date,
            cmd.target_quantity,
            blank_to_none(cmd.color),
            blank_to_none(cmd.size),
            blank_to_none(cmd.notes),
        )?;
        if let Some(status) = cmd.status {
            order.transition_to(status)?;
        }
        uow.orders().update(&order).await?;
        uow.commit().await?;

        info!(status = %order.status, "Order updated");
        Ok(order)
    }

    /// 删除订单（有工作记录时拒绝）
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn delete_order(&self, id: &OrderId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let order = uow
            .orders()
            .lock_by_id(id)
            .await?
            .ok_or_else(|| order_not_found(id))?;

        let references = uow.work_logs().count_by_order(id).await?;
        if references > 0 {
            return Err(AppError::integrity_conflict(format!(
                "Order {} has {} work log(s) and cannot be deleted",
                order.order_no, references
            )));
        }

        cascade_delete_for_order(uow.as_ref(), id).await?;
        uow.orders().delete(id).await?;
        uow.commit().await?;

        info!(order_no = %order.order_no, "Order deleted");
        Ok(())
    }

    pub async fn get_order(&self, id: &OrderId) -> AppResult<Order> {
        let uow = self.uow_factory.begin_readonly().await?;
        let order = uow
            .orders()
            .find_by_id(id)
            .await?
            .ok_or_else(|| order_not_found(id))?;
        uow.commit().await?;
        Ok(order)
    }

    pub async fn list_orders(&self, pagination: &Pagination) -> AppResult<PagedResult<Order>> {
        let pagination = pagination.clone().normalized();
        let uow = self.uow_factory.begin_readonly().await?;
        let (items, total) = uow.orders().list(&pagination).await?;
        uow.commit().await?;
        Ok(PagedResult::new(items, total, &pagination))
    }

    // ---------------------------------------------------------------------
    // 工序
    // ---------------------------------------------------------------------

    #[instrument(skip(self, cmd), fields(name = %cmd.name))]
    pub async fn create_process(&self, cmd: ProcessCommand) -> AppResult<Process> {
        let mut process = Process::new(cmd.name, cmd.pay_rate, blank_to_none(cmd.description))?;
        process.is_active = cmd.is_active;

        let uow = self.uow_factory.begin().await?;
        uow.processes().create(&process).await?;
        uow.commit().await?;

        info!(process_id = %process.id, "Process created");
        Ok(process)
    }

    #[instrument(skip(self, cmd), fields(process_id = %id))]
    pub async fn update_process(&self, id: &ProcessId, cmd: ProcessCommand) -> AppResult<Process> {
        let uow = self.uow_factory.begin().await?;
        let mut process = uow
            .processes()
            .find_by_id(id)
            .await?
            .ok_or_else(|| process_not_found(id))?;

        process.update(
            cmd.name,
            cmd.pay_rate,
            blank_to_none(cmd.description),
            cmd.is_active,
        )?;
        uow.processes().update(&process).await?;
        uow.commit().await?;
        Ok(process)
    }

    /// 删除工序（有工作记录时拒绝）
    #[instrument(skip(self), fields(process_id = %id))]
    pub async fn delete_process(&self, id: &ProcessId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let process = uow
            .processes()
            .find_by_id(id)
            .await?
            .ok_or_else(|| process_not_found(id))?;

        let references = uow.work_logs().count_by_process(id).await?;
        if references > 0 {
            return Err(AppError::integrity_conflict(format!(
                "Process '{}' has {} work log(s) and cannot be deleted",
                process.name, references
            )));
        }

        cascade_delete_for_process(uow.as_ref(), id).await?;
        uow.processes().delete(id).await?;
        uow.commit().await?;

        info!(name = %process.name, "Process deleted");
        Ok(())
    }

    pub async fn get_process(&self, id: &ProcessId) -> AppResult<Process> {
        let uow = self.uow_factory.begin_readonly().await?;
        let process = uow
            .processes()
            .find_by_id(id)
            .await?
            .ok_or_else(|| process_not_found(id))?;
        uow.commit().await?;
        Ok(process)
    }

    pub async fn list_processes(&self, active_only: bool) -> AppResult<Vec<Process>> {
        let uow = self.uow_factory.begin_readonly().await?;
        let processes = uow.processes().list(active_only).await?;
        uow.commit().await?;
        Ok(processes)
    }

    // ---------------------------------------------------------------------
    // 员工
    // ---------------------------------------------------------------------

    #[instrument(skip(self, cmd), fields(code = %cmd.code))]
    pub async fn create_employee(&self, cmd: CreateEmployeeCommand) -> AppResult<Employee> {
        let employee = Employee::new(cmd.code, cmd.name)?;

        let uow = self.uow_factory.begin().await?;
        if uow
            .employees()
            .find_by_code(&employee.code)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "Employee code '{}' already exists",
                employee.code
            )));
        }
        uow.employees().create(&employee).await?;
        uow.commit().await?;

        info!(employee_id = %employee.id, "Employee created");
        Ok(employee)
    }

    pub async fn update_employee(
        &self,
        id: &EmployeeId,
        cmd: UpdateEmployeeCommand,
    ) -> AppResult<Employee> {
        let uow = self.uow_factory.begin().await?;
        let mut employee = uow
            .employees()
            .find_by_id(id)
            .await?
            .ok_or_else(|| employee_not_found(id))?;

        employee.update(cmd.name, cmd.is_active)?;
        uow.employees().update(&employee).await?;
        uow.commit().await?;
        Ok(employee)
    }

    /// 删除员工（有工作记录或工资记录时拒绝）
    #[instrument(skip(self), fields(employee_id = %id))]
    pub async fn delete_employee(&self, id: &EmployeeId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let employee = uow
            .employees()
            .find_by_id(id)
            .await?
            .ok_or_else(|| employee_not_found(id))?;

        let work_logs = uow.work_logs().count_by_employee(id).await?;
        let payments = uow.payments().count_by_employee(id).await?;
        if work_logs > 0 || payments > 0 {
            return Err(AppError::integrity_conflict(format!(
                "Employee {} has {} work log(s) and {} payment(s) and cannot be deleted",
                employee.code, work_logs, payments
            )));
        }

        uow.employees().delete(id).await?;
        uow.commit().await?;

        info!(code = %employee.code, "Employee deleted");
        Ok(())
    }

    pub async fn get_employee(&self, id: &EmployeeId) -> AppResult<Employee> {
        let uow = self.uow_factory.begin_readonly().await?;
        let employee = uow
            .employees()
            .find_by_id(id)
            .await?
            .ok_or_else(|| employee_not_found(id))?;
        uow.commit().await?;
        Ok(employee)
    }

    pub async fn list_employees(&self, active_only: bool) -> AppResult<Vec<Employee>> {
        let uow = self.uow_factory.begin_readonly().await?;
        let employees = uow.employees().list(active_only).await?;
        uow.commit().await?;
        Ok(employees)
    }
}

fn order_not_found(id: &OrderId) -> AppError {
    AppError::not_found(format!("Order {} not found", id))
}

fn process_not_found(id: &ProcessId) -> AppError {
    AppError::not_found(format!("Process {} not found", id))
}

fn employee_not_found(id: &EmployeeId) -> AppError {
    AppError::not_found(format!("Employee {} not found", id))
}
