//! 生产服务
//!
//! 订单、工序、员工基础资料，工作记录录入与超产确认，超产台账，计件工资报表。

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
pub mod test_support;
