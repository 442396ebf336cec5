//! 会话服务
//!
//! 会话记录保存在缓存中，按空闲时间过期；每次认证成功都会续期。

use std::sync::Arc;
use std::time::Duration;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use chrono::{DateTime, Utc};
use oleema_errors::{AppError, AppResult};
use oleema_ports::CachePort;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::staging::PendingWorkLogStore;

/// 会话 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// 解析客户端传入的会话 ID（32 位十六进制）
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.len() == 32 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 会话记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

fn session_key(id: &SessionId) -> String {
    format!("session:{}", id)
}

/// 会话服务
pub struct SessionService {
    cache: Arc<dyn CachePort>,
    staging: Arc<dyn PendingWorkLogStore>,
    admin_username: String,
    admin_password_hash: Secret<String>,
    idle_timeout: Duration,
}

impl SessionService {
    pub fn new(
        cache: Arc<dyn CachePort>,
        staging: Arc<dyn PendingWorkLogStore>,
        admin_username: String,
        admin_password_hash: Secret<String>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            staging,
            admin_username,
            admin_password_hash,
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// 登录
    pub async fn login(&self, username: &str, password: &str) -> AppResult<Session> {
        let username_ok = username.trim() == self.admin_username;
        // 用户名错误时同样执行哈希校验
        let password_ok = self.verify_password(password)?;

        if !(username_ok && password_ok) {
            warn!(username = %username, "Login failed");
            return Err(AppError::unauthenticated("Invalid username or password"));
        }

        let session = Session {
            id: SessionId::generate(),
            username: self.admin_username.clone(),
            created_at: Utc::now(),
        };
        let payload = serde_json::to_string(&session)
            .map_err(|e| AppError::internal(format!("Failed to encode session: {}", e)))?;
        self.cache
            .set(&session_key(&session.id), &payload, Some(self.idle_timeout))
            .await?;

        info!(username = %session.username, "Session created");
        Ok(session)
    }

    /// 校验会话并续期
    pub async fn authenticate(&self, id: &SessionId) -> AppResult<Session> {
        let key = session_key(id);
        let payload = self
            .cache
            .get(&key)
            .await?
            .ok_or_else(|| AppError::unauthenticated("Session expired or invalid"))?;
        let session: Session = serde_json::from_str(&payload)
            .map_err(|e| AppError::internal(format!("Corrupt session record: {}", e)))?;

        self.cache.expire(&key, self.idle_timeout).await?;
        self.staging.touch(id).await?;
        Ok(session)
    }

    /// 注销（同时丢弃待审工作记录）
    pub async fn logout(&self, id: &SessionId) -> AppResult<()> {
        self.cache.delete(&session_key(id)).await?;
        self.staging.discard(id).await?;
        info!(session = %id, "Session closed");
        Ok(())
    }

    fn verify_password(&self, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(self.admin_password_hash.expose_secret())
            .map_err(|e| AppError::internal(format!("Invalid admin password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
