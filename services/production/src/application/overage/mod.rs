//! 超产台账
//!
//! 检测时插入或更新、人工处理、随订单/工序级联删除以及看板查询。

mod ledger;
mod queries;

pub use ledger::{
    OverageLedger, OverageRecord, cascade_delete_for_order, cascade_delete_for_process,
    record_or_update,
};
pub use queries::{OverageDashboard, OverageDetail, OverageView};
