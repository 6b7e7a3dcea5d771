//! Role model and mutation permissions.
//!
//! Roles arrive from the session collaborator in several raw spellings
//! (`1`, `"1"`, `"SUPERADMIN"`); `Role::parse_value` is the single
//! normalization boundary. Nothing below this module compares raw roles.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Order;
use crate::{CoreError, CoreResult};

pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn code(self) -> u8 {
        match self {
            Role::Admin => 0,
            Role::SuperAdmin => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Normalize a raw role value from the session boundary.
    ///
    /// Out-of-range numerics (2, -1, ...) are an error, never a silent
    /// privilege upgrade.
    pub fn parse_str(raw: &str) -> CoreResult<Role> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "0" | "ADMIN" => Ok(Role::Admin),
            "1" | "SUPERADMIN" | "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            other => Err(CoreError::Validation(format!("unknown role: {other}"))),
        }
    }

    pub fn parse_code(raw: i64) -> CoreResult<Role> {
        match raw {
            0 => Ok(Role::Admin),
            1 => Ok(Role::SuperAdmin),
            other => Err(CoreError::Validation(format!("unknown role code: {other}"))),
        }
    }

    /// Session claims carry the role as either a JSON number or string.
    pub fn parse_value(raw: &Value) -> CoreResult<Role> {
        match raw {
            Value::Number(n) => {
                let code = n
                    .as_i64()
                    .ok_or_else(|| CoreError::Validation(format!("unknown role code: {n}")))?;
                Role::parse_code(code)
            }
            Value::String(s) => Role::parse_str(s),
            other => Err(CoreError::Validation(format!("unknown role value: {other}"))),
        }
    }
}

/// The per-request fact supplied by the external session collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActingUser {
    pub is_admin: bool,
    pub role: Option<Role>,
}

impl ActingUser {
    pub fn admin(role: Role) -> Self {
        Self {
            is_admin: true,
            role: Some(role),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            is_admin: false,
            role: None,
        }
    }
}

/// Structured decision surfaced verbatim by the 403 path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl PermissionDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            code: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            code: Some(PERMISSION_DENIED.to_string()),
        }
    }
}

/// Any authenticated admin may edit an order; nobody else may.
pub fn can_edit_order(actor: &ActingUser, _order: &Order) -> PermissionDecision {
    if !actor.is_admin || actor.role.is_none() {
        return PermissionDecision::deny("admin session required to edit orders");
    }
    PermissionDecision::allow()
}

/// Confirming over a conflict is the sensitive mutation.
///
/// SuperAdmin may confirm over any conflict. Admin may confirm over
/// unconfirmed conflicts only; a conflict with an already-confirmed order
/// must be resolved first.
pub fn can_confirm_order(
    actor: &ActingUser,
    order: &Order,
    conflicts: &[&Order],
) -> PermissionDecision {
    let role = match (actor.is_admin, actor.role) {
        (true, Some(role)) => role,
        _ => return PermissionDecision::deny("admin session required to confirm orders"),
    };

    if conflicts.is_empty() || role == Role::SuperAdmin {
        return PermissionDecision::allow();
    }

    if conflicts.iter().any(|c| c.confirmed) {
        tracing::warn!(
            order_id = %order.id,
            "admin blocked from confirming over a confirmed conflict"
        );
        return PermissionDecision::deny(
            "order conflicts with an already-confirmed booking; resolve the conflict first",
        );
    }

    PermissionDecision::allow()
}
