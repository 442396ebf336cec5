//! 订单仓储接口

use async_trait::async_trait;
use oleema_common::Pagination;
use oleema_errors::AppResult;

use super::order::{Order, OrderId};

/// 订单仓储接口
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 创建订单
    async fn create(&self, order: &Order) -> AppResult<()>;

    /// 更新订单
    async fn update(&self, order: &Order) -> AppResult<()>;

    /// 删除订单
    async fn delete(&self, id: &OrderId) -> AppResult<()>;

    /// 根据 ID 查找订单
    async fn find_by_id(&self, id: &OrderId) -> AppResult<Option<Order>>;

    /// 查找并锁定订单行（事务结束前其他写入者等待）
    async fn lock_by_id(&self, id: &OrderId) -> AppResult<Option<Order>>;

    /// 根据订单号查找
    async fn find_by_order_no(&self, order_no: &str) -> AppResult<Option<Order>>;

    /// 分页列出订单（按订单日期倒序）
    async fn list(&self, pagination: &Pagination) -> AppResult<(Vec<Order>, u64)>;
}
