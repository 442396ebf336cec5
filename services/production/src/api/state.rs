//! HTTP 共享状态

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use oleema_common::TrailingWindow;
use oleema_config::AppConfig;
use oleema_ports::CachePort;

use crate::application::catalog::CatalogCommandHandler;
use crate::application::integrity::IntegrityService;
use crate::application::overage::OverageLedger;
use crate::application::payment::PaymentReportService;
use crate::application::session::SessionService;
use crate::application::staging::{CachePendingWorkLogStore, PendingWorkLogStore};
use crate::application::work_log::WorkLogCommandHandler;
use crate::domain::unit_of_work::UnitOfWorkFactory;

/// 会话 Cookie 设置
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub max_age: Duration,
    pub secure: bool,
}

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub uow_factory: Arc<dyn UnitOfWorkFactory>,
    pub cache: Arc<dyn CachePort>,
    pub sessions: Arc<SessionService>,
    pub work_logs: Arc<WorkLogCommandHandler>,
    pub overages: Arc<OverageLedger>,
    pub catalog: Arc<CatalogCommandHandler>,
    pub payments: Arc<PaymentReportService>,
    pub integrity: Arc<IntegrityService>,
    pub cookie: CookieSettings,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        cache: Arc<dyn CachePort>,
        config: &AppConfig,
    ) -> Self {
        let idle_timeout = Duration::from_secs(config.session.idle_timeout_secs);
        let staging: Arc<dyn PendingWorkLogStore> =
            Arc::new(CachePendingWorkLogStore::new(cache.clone(), idle_timeout));

        Self {
            sessions: Arc::new(SessionService::new(
                cache.clone(),
                staging.clone(),
                config.admin.username.clone(),
                config.admin.password_hash.clone(),
                idle_timeout,
            )),
            work_logs: Arc::new(WorkLogCommandHandler::new(uow_factory.clone(), staging)),
            overages: Arc::new(OverageLedger::new(
                uow_factory.clone(),
                TrailingWindow::days(config.overage.resolved_window_days),
            )),
            catalog: Arc::new(CatalogCommandHandler::new(uow_factory.clone())),
            payments: Arc::new(PaymentReportService::new(
                uow_factory.clone(),
                config.payments.unit_label.clone(),
            )),
            integrity: Arc::new(IntegrityService::new(uow_factory.clone())),
            cookie: CookieSettings {
                name: config.session.cookie_name.clone(),
                max_age: idle_timeout,
                secure: config.is_production(),
            },
            metrics: None,
            uow_factory,
            cache,
        }
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}
