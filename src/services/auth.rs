// 权限模块
// 身份提供方给出的声明在这里统一转换为角色，管理员操作凭 AdminGrant 调用

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
}

/// 当前登录用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
}

impl Identity {
    pub fn new(uid: &str, email: Option<&str>) -> Self {
        Self {
            uid: uid.to_string(),
            email: email.map(str::to_string),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("sign in required")]
    NotSignedIn,
    #[error("user {0} is not an admin")]
    NotAdmin(String),
}

/// 管理员能力凭证，只能通过 `authorize_admin` 获得
#[derive(Debug)]
pub struct AdminGrant {
    uid: String,
}

impl AdminGrant {
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            uid: "test-admin".to_string(),
        }
    }
}

/// 检查身份是否具有管理员角色
pub fn authorize_admin(identity: Option<&Identity>) -> Result<AdminGrant, AuthError> {
    let identity = identity.ok_or(AuthError::NotSignedIn)?;
    if identity.has_role(Role::Admin) {
        Ok(AdminGrant {
            uid: identity.uid.clone(),
        })
    } else {
        log::warn!("admin operation refused for user {}", identity.uid);
        Err(AuthError::NotAdmin(identity.uid.clone()))
    }
}

/// 把身份提供方的声明映射为角色
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    admin_emails: BTreeSet<String>,
}

impl AccessPolicy {
    pub fn new<I, S>(admin_emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            admin_emails: admin_emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// 由 uid 与邮箱构造带角色的身份
    pub fn resolve(&self, uid: &str, email: Option<&str>) -> Identity {
        let identity = Identity::new(uid, email);
        let is_admin = email
            .map(|e| self.admin_emails.contains(&e.trim().to_lowercase()))
            .unwrap_or(false);

        if is_admin {
            identity.with_role(Role::Admin)
        } else {
            identity
        }
    }
}
