//! 内存 Unit of Work

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use oleema_common::Pagination;
use oleema_errors::{AppError, AppResult};
use tokio::sync::OwnedMutexGuard;

use crate::domain::employee::{Employee, EmployeeId, EmployeeRepository};
use crate::domain::order::{Order, OrderId, OrderRepository};
use crate::domain::overage::{
    Overage, OverageContribution, OverageId, OverageRepository, OverageStatus,
};
use crate::domain::payment::{Payment, PaymentPeriod, PaymentRepository};
use crate::domain::process::{Process, ProcessId, ProcessRepository};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::domain::work_log::{WorkLog, WorkLogFilter, WorkLogId, WorkLogRepository};

#[derive(Debug, Clone, Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    processes: HashMap<ProcessId, Process>,
    employees: HashMap<EmployeeId, Employee>,
    work_logs: HashMap<WorkLogId, WorkLog>,
    overages: HashMap<OverageId, Overage>,
    contributions: Vec<OverageContribution>,
    payments: Vec<Payment>,
}

struct Shared {
    committed: Mutex<State>,
    row_lock: Arc<tokio::sync::Mutex<()>>,
    failures: Mutex<HashSet<&'static str>>,
}

/// 内存存储
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                committed: Mutex::new(State::default()),
                row_lock: Arc::new(tokio::sync::Mutex::new(())),
                failures: Mutex::new(HashSet::new()),
            }),
        }
    }

    pub fn factory(&self) -> Arc<dyn UnitOfWorkFactory> {
        Arc::new(self.clone())
    }

    pub async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        UnitOfWorkFactory::begin(self).await
    }

    /// 注入失败（如 "work_logs.create"、"commit"）
    pub fn fail_on(&self, op: &'static str) {
        self.shared.failures.lock().unwrap().insert(op);
    }

    pub fn clear_failures(&self) {
        self.shared.failures.lock().unwrap().clear();
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        f(&self.shared.committed.lock().unwrap())
    }

    fn write(&self, f: impl FnOnce(&mut State)) {
        f(&mut self.shared.committed.lock().unwrap())
    }

    pub fn insert_order(&self, order: Order) {
        self.write(|s| {
            s.orders.insert(order.id, order);
        });
    }

    pub fn insert_process(&self, process: Process) {
        self.write(|s| {
            s.processes.insert(process.id, process);
        });
    }

    pub fn insert_employee(&self, employee: Employee) {
        self.write(|s| {
            s.employees.insert(employee.id, employee);
        });
    }

    /// 绕过约束直接写入
    pub fn insert_raw_work_log(&self, log: WorkLog) {
        self.write(|s| {
            s.work_logs.insert(log.id, log);
        });
    }

    /// 绕过约束直接写入（可构造孤儿记录）
    pub fn insert_raw_overage(&self, overage: Overage) {
        self.write(|s| {
            s.overages.insert(overage.id, overage);
        });
    }

    pub fn insert_raw_payment(&self, payment: Payment) {
        self.write(|s| s.payments.push(payment));
    }

    pub fn remove_order_raw(&self, id: OrderId) {
        self.write(|s| {
            s.orders.remove(&id);
        });
    }

    pub fn order(&self, id: OrderId) -> Option<Order> {
        self.read(|s| s.orders.get(&id).cloned())
    }

    pub fn process(&self, id: ProcessId) -> Option<Process> {
        self.read(|s| s.processes.get(&id).cloned())
    }

    pub fn employee(&self, id: EmployeeId) -> Option<Employee> {
        self.read(|s| s.employees.get(&id).cloned())
    }

    pub fn overage(&self, id: OverageId) -> Option<Overage> {
        self.read(|s| s.overages.get(&id).cloned())
    }

    pub fn all_overages(&self) -> Vec<Overage> {
        self.read(|s| s.overages.values().cloned().collect())
    }

    pub fn all_work_logs(&self) -> Vec<WorkLog> {
        self.read(|s| s.work_logs.values().cloned().collect())
    }

    pub fn all_contributions(&self) -> Vec<OverageContribution> {
        self.read(|s| s.contributions.clone())
    }

    pub fn all_payments(&self) -> Vec<Payment> {
        self.read(|s| s.payments.clone())
    }

    pub fn work_log_count(&self) -> usize {
        self.read(|s| s.work_logs.len())
    }

    pub fn pending_count(&self, order_id: OrderId, process_id: ProcessId) -> usize {
        self.read(|s| {
            s.overages
                .values()
                .filter(|o| {
                    o.order_id == order_id && o.process_id == process_id && o.is_pending()
                })
                .count()
        })
    }
}

#[async_trait]
impl UnitOfWorkFactory for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        self.open(false)
    }

    async fn begin_readonly(&self) -> AppResult<Box<dyn UnitOfWork>> {
        self.open(true)
    }
}

impl MemoryStore {
    fn open(&self, read_only: bool) -> AppResult<Box<dyn UnitOfWork>> {
        let failing = self.shared.failures.lock().unwrap().contains("begin");
        if failing {
            return Err(AppError::database("injected failure: begin"));
        }
        let snapshot = self.shared.committed.lock().unwrap().clone();
        Ok(Box::new(MemoryUnitOfWork {
            shared: self.shared.clone(),
            working: Mutex::new(snapshot),
            lock: tokio::sync::Mutex::new(None),
            read_only,
        }))
    }
}

/// 内存工作单元（同时实现全部仓储接口）
pub struct MemoryUnitOfWork {
    shared: Arc<Shared>,
    working: Mutex<State>,
    lock: tokio::sync::Mutex<Option<OwnedMutexGuard<()>>>,
    read_only: bool,
}

impl MemoryUnitOfWork {
    fn check(&self, op: &'static str) -> AppResult<()> {
        if self.shared.failures.lock().unwrap().contains(op) {
            return Err(AppError::database(format!("injected failure: {}", op)));
        }
        Ok(())
    }

    fn read<T>(&self, op: &'static str, f: impl FnOnce(&State) -> T) -> AppResult<T> {
        self.check(op)?;
        Ok(f(&self.working.lock().unwrap()))
    }

    fn write<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut State) -> AppResult<T>,
    ) -> AppResult<T> {
        self.check(op)?;
        if self.read_only {
            return Err(AppError::database("cannot execute in a read-only transaction"));
        }
        f(&mut self.working.lock().unwrap())
    }
}

fn fk(ok: bool, what: &str) -> AppResult<()> {
    if ok {
        Ok(())
    } else {
        Err(AppError::integrity_conflict(format!("foreign key violation: {}", what)))
    }
}

fn newest_first(a: &WorkLog, b: &WorkLog) -> std::cmp::Ordering {
    b.work_date
        .cmp(&a.work_date)
        .then(b.created_at.cmp(&a.created_at))
        .then(b.id.cmp(&a.id))
}

fn remove_overages(state: &mut State, ids: &HashSet<OverageId>) -> u64 {
    state.contributions.retain(|c| !ids.contains(&c.overage_id));
    let before = state.overages.len();
    state.overages.retain(|id, _| !ids.contains(id));
    (before - state.overages.len()) as u64
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    fn orders(&self) -> &dyn OrderRepository {
        self
    }

    fn processes(&self) -> &dyn ProcessRepository {
        self
    }

    fn employees(&self) -> &dyn EmployeeRepository {
        self
    }

    fn work_logs(&self) -> &dyn WorkLogRepository {
        self
    }

    fn overages(&self) -> &dyn OverageRepository {
        self
    }

    fn payments(&self) -> &dyn PaymentRepository {
        self
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.check("commit")?;
        if !self.read_only {
            let working = self.working.lock().unwrap().clone();
            *self.shared.committed.lock().unwrap() = working;
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryUnitOfWork {
    async fn create(&self, order: &Order) -> AppResult<()> {
        self.write("orders.create", |s| {
            if s.orders.values().any(|o| o.order_no == order.order_no) {
                return Err(AppError::conflict("duplicate order_no"));
            }
            s.orders.insert(order.id, order.clone());
            Ok(())
        })
    }

    async fn update(&self, order: &Order) -> AppResult<()> {
        self.write("orders.update", |s| {
            s.orders.insert(order.id, order.clone());
            Ok(())
        })
    }

    async fn delete(&self, id: &OrderId) -> AppResult<()> {
        self.write("orders.delete", |s| {
            fk(
                !s.work_logs.values().any(|l| &l.order_id == id),
                "work_logs.order_id",
            )?;
            fk(
                !s.overages.values().any(|o| &o.order_id == id),
                "overages.order_id",
            )?;
            s.orders.remove(id);
            Ok(())
        })
    }

    async fn find_by_id(&self, id: &OrderId) -> AppResult<Option<Order>> {
        self.read("orders.find_by_id", |s| s.orders.get(id).cloned())
    }

    async fn lock_by_id(&self, id: &OrderId) -> AppResult<Option<Order>> {
        self.check("orders.lock_by_id")?;
        let mut held = self.lock.lock().await;
        if held.is_none() {
            *held = Some(self.shared.row_lock.clone().lock_owned().await);
            // 加锁后读取最新已提交状态
            let committed = self.shared.committed.lock().unwrap().clone();
            *self.working.lock().unwrap() = committed;
        }
        self.read("orders.find_by_id", |s| s.orders.get(id).cloned())
    }

    async fn find_by_order_no(&self, order_no: &str) -> AppResult<Option<Order>> {
        self.read("orders.find_by_order_no", |s| {
            s.orders.values().find(|o| o.order_no == order_no).cloned()
        })
    }

    async fn list(&self, pagination: &Pagination) -> AppResult<(Vec<Order>, u64)> {
        self.read("orders.list", |s| {
            let mut orders: Vec<_> = s.orders.values().cloned().collect();
            orders.sort_by(|a, b| {
                b.order_date
                    .cmp(&a.order_date)
                    .then(b.created_at.cmp(&a.created_at))
            });
            let total = orders.len() as u64;
            let page = orders
                .into_iter()
                .skip(pagination.offset() as usize)
                .take(pagination.limit() as usize)
                .collect();
            (page, total)
        })
    }
}

#[async_trait]
impl ProcessRepository for MemoryUnitOfWork {
    async fn create(&self, process: &Process) -> AppResult<()> {
        self.write("processes.create", |s| {
            s.processes.insert(process.id, process.clone());
            Ok(())
        })
    }

    async fn update(&self, process: &Process) -> AppResult<()> {
        self.write("processes.update", |s| {
            s.processes.insert(process.id, process.clone());
            Ok(())
        })
    }

    async fn delete(&self, id: &ProcessId) -> AppResult<()> {
        self.write("processes.delete", |s| {
            fk(
                !s.work_logs.values().any(|l| &l.process_id == id),
                "work_logs.process_id",
            )?;
            fk(
                !s.overages.values().any(|o| &o.process_id == id),
                "overages.process_id",
            )?;
            s.processes.remove(id);
            Ok(())
        })
    }

    async fn find_by_id(&self, id: &ProcessId) -> AppResult<Option<Process>> {
        self.read("processes.find_by_id", |s| s.processes.get(id).cloned())
    }

    async fn list(&self, active_only: bool) -> AppResult<Vec<Process>> {
        self.read("processes.list", |s| {
            let mut list: Vec<_> = s
                .processes
                .values()
                .filter(|p| !active_only || p.is_active)
                .cloned()
                .collect();
            list.sort_by(|a, b| a.name.cmp(&b.name));
            list
        })
    }
}

#[async_trait]
impl EmployeeRepository for MemoryUnitOfWork {
    async fn create(&self, employee: &Employee) -> AppResult<()> {
        self.write("employees.create", |s| {
            if s.employees.values().any(|e| e.code == employee.code) {
                return Err(AppError::conflict("duplicate employee code"));
            }
            s.employees.insert(employee.id, employee.clone());
            Ok(())
        })
    }

    async fn update(&self, employee: &Employee) -> AppResult<()> {
        self.write("employees.update", |s| {
            s.employees.insert(employee.id, employee.clone());
            Ok(())
        })
    }

    async fn delete(&self, id: &EmployeeId) -> AppResult<()> {
        self.write("employees.delete", |s| {
            fk(
                !s.work_logs.values().any(|l| &l.employee_id == id),
                "work_logs.employee_id",
            )?;
            fk(
                !s.payments.iter().any(|p| &p.employee_id == id),
                "payments.employee_id",
            )?;
            s.employees.remove(id);
            Ok(())
        })
    }

    async fn find_by_id(&self, id: &EmployeeId) -> AppResult<Option<Employee>> {
        self.read("employees.find_by_id", |s| s.employees.get(id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Employee>> {
        self.read("employees.find_by_code", |s| {
            s.employees.values().find(|e| e.code == code).cloned()
        })
    }

    async fn list(&self, active_only: bool) -> AppResult<Vec<Employee>> {
        self.read("employees.list", |s| {
            let mut list: Vec<_> = s
                .employees
                .values()
                .filter(|e| !active_only || e.is_active)
                .cloned()
                .collect();
            list.sort_by(|a, b| a.code.cmp(&b.code));
            list
        })
    }
}

#[async_trait]
impl WorkLogRepository for MemoryUnitOfWork {
    async fn create(&self, log: &WorkLog) -> AppResult<()> {
        self.write("work_logs.create", |s| {
            fk(s.orders.contains_key(&log.order_id), "work_logs.order_id")?;
            fk(s.processes.contains_key(&log.process_id), "work_logs.process_id")?;
            fk(s.employees.contains_key(&log.employee_id), "work_logs.employee_id")?;
            s.work_logs.insert(log.id, log.clone());
            Ok(())
        })
    }

    async fn update(&self, log: &WorkLog) -> AppResult<()> {
        self.write("work_logs.update", |s| {
            fk(s.orders.contains_key(&log.order_id), "work_logs.order_id")?;
            fk(s.processes.contains_key(&log.process_id), "work_logs.process_id")?;
            fk(s.employees.contains_key(&log.employee_id), "work_logs.employee_id")?;
            s.work_logs.insert(log.id, log.clone());
            Ok(())
        })
    }

    async fn delete(&self, id: &WorkLogId) -> AppResult<()> {
        self.write("work_logs.delete", |s| {
            fk(
                !s.contributions.iter().any(|c| &c.work_log_id == id),
                "work_log_overages.work_log_id",
            )?;
            s.work_logs.remove(id);
            Ok(())
        })
    }

    async fn find_by_id(&self, id: &WorkLogId) -> AppResult<Option<WorkLog>> {
        self.read("work_logs.find_by_id", |s| s.work_logs.get(id).cloned())
    }

    async fn sum_quantity(
        &self,
        order_id: &OrderId,
        process_id: &ProcessId,
        excluding: Option<&WorkLogId>,
    ) -> AppResult<i64> {
        self.read("work_logs.sum_quantity", |s| {
            s.work_logs
                .values()
                .filter(|l| &l.order_id == order_id && &l.process_id == process_id)
                .filter(|l| excluding != Some(&l.id))
                .map(|l| i64::from(l.quantity))
                .sum()
        })
    }

    async fn count_by_order(&self, order_id: &OrderId) -> AppResult<i64> {
        self.read("work_logs.count_by_order", |s| {
            s.work_logs.values().filter(|l| &l.order_id == order_id).count() as i64
        })
    }

    async fn count_by_process(&self, process_id: &ProcessId) -> AppResult<i64> {
        self.read("work_logs.count_by_process", |s| {
            s.work_logs
                .values()
                .filter(|l| &l.process_id == process_id)
                .count() as i64
        })
    }

    async fn count_by_employee(&self, employee_id: &EmployeeId) -> AppResult<i64> {
        self.read("work_logs.count_by_employee", |s| {
            s.work_logs
                .values()
                .filter(|l| &l.employee_id == employee_id)
                .count() as i64
        })
    }

    async fn list_for_pair(
        &self,
        order_id: &OrderId,
        process_id: &ProcessId,
    ) -> AppResult<Vec<WorkLog>> {
        self.read("work_logs.list_for_pair", |s| {
            let mut logs: Vec<_> = s
                .work_logs
                .values()
                .filter(|l| &l.order_id == order_id && &l.process_id == process_id)
                .cloned()
                .collect();
            logs.sort_by(newest_first);
            logs
        })
    }

    async fn list_for_employee_between(
        &self,
        employee_id: &EmployeeId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<WorkLog>> {
        self.read("work_logs.list_for_employee_between", |s| {
            let mut logs: Vec<_> = s
                .work_logs
                .values()
                .filter(|l| {
                    &l.employee_id == employee_id && l.work_date >= from && l.work_date <= to
                })
                .cloned()
                .collect();
            logs.sort_by(|a, b| newest_first(b, a));
            logs
        })
    }

    async fn list(
        &self,
        filter: &WorkLogFilter,
        pagination: &Pagination,
    ) -> AppResult<(Vec<WorkLog>, u64)> {
        self.read("work_logs.list", |s| {
            let mut logs: Vec<_> = s
                .work_logs
                .values()
                .filter(|l| filter.matches(l))
                .cloned()
                .collect();
            logs.sort_by(newest_first);
            let total = logs.len() as u64;
            let page = logs
                .into_iter()
                .skip(pagination.offset() as usize)
                .take(pagination.limit() as usize)
                .collect();
            (page, total)
        })
    }
}

#[async_trait]
impl OverageRepository for MemoryUnitOfWork {
    async fn find_pending(
        &self,
        order_id: &OrderId,
        process_id: &ProcessId,
    ) -> AppResult<Option<Overage>> {
        self.read("overages.find_pending", |s| {
            s.overages
                .values()
                .find(|o| &o.order_id == order_id && &o.process_id == process_id && o.is_pending())
                .cloned()
        })
    }

    async fn create(&self, overage: &Overage) -> AppResult<()> {
        self.write("overages.create", |s| {
            fk(s.orders.contains_key(&overage.order_id), "overages.order_id")?;
            fk(s.processes.contains_key(&overage.process_id), "overages.process_id")?;
            // 部分唯一索引
            if overage.is_pending()
                && s.overages.values().any(|o| {
                    o.order_id == overage.order_id
                        && o.process_id == overage.process_id
                        && o.is_pending()
                })
            {
                return Err(AppError::conflict("duplicate pending overage"));
            }
            s.overages.insert(overage.id, overage.clone());
            Ok(())
        })
    }

    async fn update(&self, overage: &Overage) -> AppResult<()> {
        self.write("overages.update", |s| {
            s.overages.insert(overage.id, overage.clone());
            Ok(())
        })
    }

    async fn find_by_id(&self, id: &OverageId) -> AppResult<Option<Overage>> {
        self.read("overages.find_by_id", |s| s.overages.get(id).cloned())
    }

    async fn list_pending(&self) -> AppResult<Vec<Overage>> {
        self.read("overages.list_pending", |s| {
            let mut list: Vec<_> = s
                .overages
                .values()
                .filter(|o| o.status == OverageStatus::Pending)
                .cloned()
                .collect();
            list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            list
        })
    }

    async fn list_resolved_since(&self, since: DateTime<Utc>) -> AppResult<Vec<Overage>> {
        self.read("overages.list_resolved_since", |s| {
            let mut list: Vec<_> = s
                .overages
                .values()
                .filter(|o| {
                    o.status == OverageStatus::Resolved && o.resolved_at.is_some_and(|t| t >= since)
                })
                .cloned()
                .collect();
            list.sort_by(|a, b| b.resolved_at.cmp(&a.resolved_at));
            list
        })
    }

    async fn delete_by_order(&self, order_id: &OrderId) -> AppResult<u64> {
        self.write("overages.delete_by_order", |s| {
            let ids = s
                .overages
                .values()
                .filter(|o| &o.order_id == order_id)
                .map(|o| o.id)
                .collect();
            Ok(remove_overages(s, &ids))
        })
    }

    async fn delete_by_process(&self, process_id: &ProcessId) -> AppResult<u64> {
        self.write("overages.delete_by_process", |s| {
            let ids = s
                .overages
                .values()
                .filter(|o| &o.process_id == process_id)
                .map(|o| o.id)
                .collect();
            Ok(remove_overages(s, &ids))
        })
    }

    async fn add_contribution(&self, contribution: &OverageContribution) -> AppResult<()> {
        self.write("overages.add_contribution", |s| {
            fk(
                s.overages.contains_key(&contribution.overage_id),
                "work_log_overages.overage_id",
            )?;
            fk(
                s.work_logs.contains_key(&contribution.work_log_id),
                "work_log_overages.work_log_id",
            )?;
            s.contributions.push(contribution.clone());
            Ok(())
        })
    }

    async fn list_contributions(
        &self,
        overage_id: &OverageId,
    ) -> AppResult<Vec<OverageContribution>> {
        self.read("overages.list_contributions", |s| {
            s.contributions
                .iter()
                .filter(|c| &c.overage_id == overage_id)
                .cloned()
                .collect()
        })
    }

    async fn delete_contributions_for_work_log(&self, work_log_id: &WorkLogId) -> AppResult<u64> {
        self.write("overages.delete_contributions_for_work_log", |s| {
            let before = s.contributions.len();
            s.contributions.retain(|c| &c.work_log_id != work_log_id);
            Ok((before - s.contributions.len()) as u64)
        })
    }

    async fn find_orphans(&self) -> AppResult<Vec<Overage>> {
        self.read("overages.find_orphans", |s| {
            s.overages
                .values()
                .filter(|o| {
                    !s.orders.contains_key(&o.order_id) || !s.processes.contains_key(&o.process_id)
                })
                .cloned()
                .collect()
        })
    }

    async fn delete_by_ids(&self, ids: &[OverageId]) -> AppResult<u64> {
        self.write("overages.delete_by_ids", |s| {
            let ids = ids.iter().copied().collect();
            Ok(remove_overages(s, &ids))
        })
    }
}

#[async_trait]
impl PaymentRepository for MemoryUnitOfWork {
    async fn upsert(&self, payment: &Payment) -> AppResult<Payment> {
        self.write("payments.upsert", |s| {
            fk(
                s.employees.contains_key(&payment.employee_id),
                "payments.employee_id",
            )?;
            let stored = match s.payments.iter_mut().find(|p| {
                p.employee_id == payment.employee_id && p.period == payment.period
            }) {
                Some(existing) => {
                    let id = existing.id;
                    *existing = Payment {
                        id,
                        ..payment.clone()
                    };
                    existing.clone()
                }
                None => {
                    s.payments.push(payment.clone());
                    payment.clone()
                }
            };
            Ok(stored)
        })
    }

    async fn find(
        &self,
        employee_id: &EmployeeId,
        period: &PaymentPeriod,
    ) -> AppResult<Option<Payment>> {
        self.read("payments.find", |s| {
            s.payments
                .iter()
                .find(|p| &p.employee_id == employee_id && &p.period == period)
                .cloned()
        })
    }

    async fn count_by_employee(&self, employee_id: &EmployeeId) -> AppResult<i64> {
        self.read("payments.count_by_employee", |s| {
            s.payments
                .iter()
                .filter(|p| &p.employee_id == employee_id)
                .count() as i64
        })
    }
}
