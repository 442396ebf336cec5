//! 计件工资报表
//!
//! 员工某月的每条工作记录按工序单价计价，按日汇总并写入月度工资记录。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use oleema_domain_core::Money;
use oleema_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::order::OrderId;
use crate::domain::payment::{Payment, PaymentPeriod};
use crate::domain::process::{Process, ProcessId};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

/// 报表查询
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentReportQuery {
    pub employee_id: EmployeeId,
    pub year: i32,
    pub month: u32,
}

/// 报表明细行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentLine {
    pub work_date: NaiveDate,
    pub order_no: String,
    pub process_name: String,
    pub quantity: i32,
    pub rate: Money,
    pub amount: Money,
}

/// 日合计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub work_date: NaiveDate,
    pub quantity: i64,
    pub amount: Money,
}

/// 工资报表
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReport {
    pub employee: Employee,
    pub period: PaymentPeriod,
    pub unit_label: String,
    pub lines: Vec<PaymentLine>,
    pub daily_totals: Vec<DailyTotal>,
    pub total_quantity: i64,
    pub total_amount: Money,
    pub payment: Payment,
}

/// 工资报表服务
pub struct PaymentReportService {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    unit_label: String,
}

impl PaymentReportService {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>, unit_label: impl Into<String>) -> Self {
        Self {
            uow_factory,
            unit_label: unit_label.into(),
        }
    }

    /// 生成报表并写入（覆盖）当月工资记录
    #[instrument(skip(self), fields(employee_id = %query.employee_id))]
    pub async fn generate(&self, query: PaymentReportQuery) -> AppResult<PaymentReport> {
        let period = PaymentPeriod::new(query.year, query.month)?;

        let uow = self.uow_factory.begin().await?;
        let employee = uow
            .employees()
            .find_by_id(&query.employee_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Employee {} not found", query.employee_id))
            })?;

        let lines = build_lines(uow.as_ref(), &employee.id, &period).await?;
        let daily_totals = daily_totals(&lines)?;
        let total_quantity: i64 = lines.iter().map(|l| i64::from(l.quantity)).sum();
        let total_amount =
            Money::checked_sum(lines.iter().map(|l| l.amount)).ok_or_else(amount_overflow)?;

        let payment = uow
            .payments()
            .upsert(&Payment::new(
                employee.id,
                period,
                total_quantity,
                total_amount,
            ))
            .await?;
        uow.commit().await?;

        info!(
            year = period.year,
            month = period.month,
            total_quantity,
            total_amount = %total_amount,
            "Payment calculated"
        );

        Ok(PaymentReport {
            employee,
            period,
            unit_label: self.unit_label.clone(),
            lines,
            daily_totals,
            total_quantity,
            total_amount,
            payment,
        })
    }
}

async fn build_lines(
    uow: &dyn UnitOfWork,
    employee_id: &EmployeeId,
    period: &PaymentPeriod,
) -> AppResult<Vec<PaymentLine>> {
    let logs = uow
        .work_logs()
        .list_for_employee_between(employee_id, period.first_day()?, period.last_day()?)
        .await?;

    let mut order_numbers: HashMap<OrderId, String> = HashMap::new();
    let mut processes: HashMap<ProcessId, Process> = HashMap::new();
    let mut lines = Vec::with_capacity(logs.len());

    for log in logs {
        let order_no = match order_numbers.get(&log.order_id) {
            Some(order_no) => order_no.clone(),
            None => {
                let order = uow
                    .orders()
                    .find_by_id(&log.order_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::internal(format!("Work log {} references missing order", log.id))
                    })?;
                order_numbers.insert(log.order_id, order.order_no.clone());
                order.order_no
            }
        };
        let process = match processes.get(&log.process_id) {
            Some(process) => process.clone(),
            None => {
                let process = uow
                    .processes()
                    .find_by_id(&log.process_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::internal(format!(
                            "Work log {} references missing process",
                            log.id
                        ))
                    })?;
                processes.insert(log.process_id, process.clone());
                process
            }
        };

        let amount = process
            .pay_rate
            .checked_mul(i64::from(log.quantity))
            .ok_or_else(amount_overflow)?;
        lines.push(PaymentLine {
            work_date: log.work_date,
            order_no,
            process_name: process.name,
            quantity: log.quantity,
            rate: process.pay_rate,
            amount,
        });
    }

    Ok(lines)
}

fn amount_overflow() -> AppError {
    AppError::invalid_state("Payment amount exceeds the supported range")
}

fn daily_totals(lines: &[PaymentLine]) -> AppResult<Vec<DailyTotal>> {
    let mut by_day: BTreeMap<NaiveDate, (i64, Money)> = BTreeMap::new();
    for line in lines {
        let entry = by_day.entry(line.work_date).or_insert((0, Money::zero()));
        entry.0 += i64::from(line.quantity);
        entry.1 = entry.1.checked_add(line.amount).ok_or_else(amount_overflow)?;
    }
    Ok(by_day
        .into_iter()
        .map(|(work_date, (quantity, amount))| DailyTotal {
            work_date,
            quantity,
            amount,
        })
        .collect())
}
