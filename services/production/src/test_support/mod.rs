//! 测试支撑：内存事务型 Unit of Work 与样例数据
//!
//! 开始时复制已提交状态，提交时整体替换；丢弃即回滚。
//! `lock_by_id` 获取全局行锁并重新读取已提交状态，模拟 `SELECT ... FOR UPDATE`。

mod memory;

pub use memory::MemoryStore;

use argon2::Argon2;
use argon2::password_hash::{PasswordHasher, SaltString};
use chrono::NaiveDate;
use oleema_domain_core::Money;

use crate::application::staging::StagedWorkLog;
use crate::application::work_log::{WorkLogForm, WorkLogSubmission};
use crate::domain::employee::Employee;
use crate::domain::order::Order;
use crate::domain::overage::{OverageEvaluation, evaluate};
use crate::domain::process::Process;
use crate::domain::work_log::WorkLog;

/// 一组订单、工序、员工
pub struct Fixture {
    pub order: Order,
    pub process: Process,
    pub employee: Employee,
}

impl Fixture {
    pub async fn seed(store: &MemoryStore, target: i32) -> Self {
        let order = Order::new(
            format!("PO-{}", &uuid::Uuid::now_v7().simple().to_string()[20..]),
            date("2024-05-01"),
            target,
            Some("navy".to_string()),
            Some("L".to_string()),
            None,
        )
        .unwrap();
        let process = Process::new("Sewing".to_string(), Money::new(250), None).unwrap();
        let employee = Employee::new(
            format!("E{}", &uuid::Uuid::now_v7().simple().to_string()[24..]),
            "Aminath".to_string(),
        )
        .unwrap();

        store.insert_order(order.clone());
        store.insert_process(process.clone());
        store.insert_employee(employee.clone());

        Self {
            order,
            process,
            employee,
        }
    }

    pub fn evaluation(&self, existing: i64, proposed: i32) -> OverageEvaluation {
        evaluate(&self.order, &self.process, existing, proposed)
    }

    pub fn form(&self, quantity: i32) -> WorkLogForm {
        WorkLogForm {
            employee_id: Some(self.employee.id.to_string()),
            order_id: Some(self.order.id.to_string()),
            process_id: Some(self.process.id.to_string()),
            quantity: Some(quantity.to_string()),
            work_date: Some("2024-05-02".to_string()),
            notes: None,
        }
    }

    pub fn work_log(&self, quantity: i32, work_date: &str) -> WorkLog {
        WorkLog::new(
            self.employee.id,
            self.order.id,
            self.process.id,
            quantity,
            date(work_date),
            None,
        )
        .unwrap()
    }
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

/// 样例暂存
pub fn staged_sample(quantity: i32) -> StagedWorkLog {
    let order = Order::new("PO-S".to_string(), date("2024-05-01"), 1, None, None, None).unwrap();
    let process = Process::new("Cutting".to_string(), Money::new(100), None).unwrap();
    let employee = Employee::new("E-S".to_string(), "Sample".to_string()).unwrap();
    let submission = WorkLogSubmission {
        employee_id: employee.id,
        order_id: order.id,
        process_id: process.id,
        quantity,
        work_date: date("2024-05-02"),
        notes: None,
    };
    StagedWorkLog::new(submission, evaluate(&order, &process, 0, quantity))
}

/// 固定盐的 Argon2 哈希
pub fn hash_password(password: &str) -> String {
    let salt = SaltString::from_b64("c2FsdHNhbHRzYWx0").unwrap();
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}
