//! Click navigation: type → route table and the router capability

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::kind::{Category, NotificationType};
use super::model::Notification;

pub const ROUTE_FRIENDS: &str = "/friends";
pub const ROUTE_EXPENSES: &str = "/expenses";
pub const ROUTE_BUDGETS: &str = "/budgets";
pub const ROUTE_BILLS: &str = "/bills";
pub const ROUTE_CHAT: &str = "/chat";
/// Fallback for any unmapped type
pub const ROUTE_NOTIFICATIONS: &str = "/notifications";

/// Navigation request handed to the external router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRequest {
    /// Clicked notification
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub route: String,
    /// Referenced object, for routers that deep-link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

impl NavigationRequest {
    pub fn for_notification(notification: &Notification) -> Self {
        Self {
            id: notification.id.clone(),
            kind: notification.kind.clone(),
            route: resolve_route(&notification.kind).to_string(),
            target_id: notification.payload.reference_id().map(str::to_string),
        }
    }
}

/// Resolve a route purely from the notification type. Never fails.
pub fn resolve_route(kind: &NotificationType) -> &'static str {
    match kind.category() {
        Category::Friend => ROUTE_FRIENDS,
        Category::Expense => ROUTE_EXPENSES,
        Category::Budget => ROUTE_BUDGETS,
        Category::Bill => ROUTE_BILLS,
        Category::Chat => ROUTE_CHAT,
        Category::Unknown => ROUTE_NOTIFICATIONS,
    }
}

/// External router
pub trait Navigator: Send + Sync {
    fn navigate(&self, request: &NavigationRequest) -> Result<()>;
}
