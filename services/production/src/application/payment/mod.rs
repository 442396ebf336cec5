//! 计件工资报表

mod report;

pub use report::{DailyTotal, PaymentLine, PaymentReport, PaymentReportQuery, PaymentReportService};
