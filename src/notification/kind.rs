//! Notification type classification and the static type config table
//!
//! Every notification carries a type string from the backend. Known types map to
//! a fixed config entry (icon, color, display duration, priority, sound); anything
//! else resolves to the `DEFAULT` entry so new backend types never break delivery.

use serde::{Deserialize, Serialize};

/// Priority level for floating notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

/// Notification category
///
/// Serialized as the backend's snake_case type string. Unknown strings are kept
/// verbatim in `Other` instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationType {
    FriendRequest,
    FriendRequestAccepted,
    ExpenseCreated,
    ExpenseUpdated,
    ExpenseShared,
    ExpenseSettled,
    BudgetWarning,
    BudgetExceeded,
    BillReminder,
    BillDue,
    BillOverdue,
    ChatMessage,
    Other(String),
}

/// Broad category, used for routing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Friend,
    Expense,
    Budget,
    Bill,
    Chat,
    Unknown,
}

/// Normalize a type string (case-insensitive, `-` and `_` ignored)
///
/// Backends have sent both `FRIEND_REQUEST` and `friend-request` over time.
fn normalize_type(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect()
}

impl NotificationType {
    pub fn parse(raw: &str) -> Self {
        match normalize_type(raw).as_str() {
            "friendrequest" => NotificationType::FriendRequest,
            "friendrequestaccepted" => NotificationType::FriendRequestAccepted,
            "expensecreated" => NotificationType::ExpenseCreated,
            "expenseupdated" => NotificationType::ExpenseUpdated,
            "expenseshared" => NotificationType::ExpenseShared,
            "expensesettled" => NotificationType::ExpenseSettled,
            "budgetwarning" => NotificationType::BudgetWarning,
            "budgetexceeded" => NotificationType::BudgetExceeded,
            "billreminder" => NotificationType::BillReminder,
            "billdue" => NotificationType::BillDue,
            "billoverdue" => NotificationType::BillOverdue,
            "chatmessage" => NotificationType::ChatMessage,
            _ => NotificationType::Other(raw.to_string()),
        }
    }

    /// Canonical wire name; `Other` returns the raw string it was built from
    pub fn as_str(&self) -> &str {
        match self {
            NotificationType::FriendRequest => "friend_request",
            NotificationType::FriendRequestAccepted => "friend_request_accepted",
            NotificationType::ExpenseCreated => "expense_created",
            NotificationType::ExpenseUpdated => "expense_updated",
            NotificationType::ExpenseShared => "expense_shared",
            NotificationType::ExpenseSettled => "expense_settled",
            NotificationType::BudgetWarning => "budget_warning",
            NotificationType::BudgetExceeded => "budget_exceeded",
            NotificationType::BillReminder => "bill_reminder",
            NotificationType::BillDue => "bill_due",
            NotificationType::BillOverdue => "bill_overdue",
            NotificationType::ChatMessage => "chat_message",
            NotificationType::Other(raw) => raw,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            NotificationType::FriendRequest | NotificationType::FriendRequestAccepted => {
                Category::Friend
            }
            NotificationType::ExpenseCreated
            | NotificationType::ExpenseUpdated
            | NotificationType::ExpenseShared
            | NotificationType::ExpenseSettled => Category::Expense,
            NotificationType::BudgetWarning | NotificationType::BudgetExceeded => Category::Budget,
            NotificationType::BillReminder | NotificationType::BillDue | NotificationType::BillOverdue => {
                Category::Bill
            }
            NotificationType::ChatMessage => Category::Chat,
            NotificationType::Other(_) => Category::Unknown,
        }
    }

    /// Static display config for this type
    pub fn config(&self) -> &'static NotificationTypeConfig {
        type_config(self)
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for NotificationType {
    fn from(raw: String) -> Self {
        NotificationType::parse(&raw)
    }
}

impl From<&str> for NotificationType {
    fn from(raw: &str) -> Self {
        NotificationType::parse(raw)
    }
}

impl From<NotificationType> for String {
    fn from(kind: NotificationType) -> Self {
        kind.as_str().to_string()
    }
}

/// Per-type display config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTypeConfig {
    pub icon: &'static str,
    pub color: &'static str,
    pub default_duration_ms: u64,
    pub priority: Priority,
    pub sound: bool,
}

pub const DEFAULT: NotificationTypeConfig = NotificationTypeConfig {
    icon: "bell",
    color: "#6b7280",
    default_duration_ms: 5_000,
    priority: Priority::Low,
    sound: false,
};

const FRIEND_REQUEST: NotificationTypeConfig = NotificationTypeConfig {
    icon: "user-plus",
    color: "#3b82f6",
    default_duration_ms: 8_000,
    priority: Priority::Medium,
    sound: true,
};

const FRIEND_REQUEST_ACCEPTED: NotificationTypeConfig = NotificationTypeConfig {
    icon: "user-check",
    color: "#10b981",
    default_duration_ms: 5_000,
    priority: Priority::Low,
    sound: true,
};

const EXPENSE: NotificationTypeConfig = NotificationTypeConfig {
    icon: "receipt",
    color: "#8b5cf6",
    default_duration_ms: 6_000,
    priority: Priority::Medium,
    sound: true,
};

const EXPENSE_SETTLED: NotificationTypeConfig = NotificationTypeConfig {
    icon: "check-circle",
    color: "#10b981",
    default_duration_ms: 5_000,
    priority: Priority::Low,
    sound: false,
};

const BUDGET_WARNING: NotificationTypeConfig = NotificationTypeConfig {
    icon: "alert-triangle",
    color: "#f59e0b",
    default_duration_ms: 8_000,
    priority: Priority::Medium,
    sound: true,
};

const BUDGET_EXCEEDED: NotificationTypeConfig = NotificationTypeConfig {
    icon: "alert-octagon",
    color: "#ef4444",
    default_duration_ms: 10_000,
    priority: Priority::High,
    sound: true,
};

const BILL_REMINDER: NotificationTypeConfig = NotificationTypeConfig {
    icon: "calendar",
    color: "#0ea5e9",
    default_duration_ms: 6_000,
    priority: Priority::Medium,
    sound: true,
};

const BILL_OVERDUE: NotificationTypeConfig = NotificationTypeConfig {
    icon: "calendar-x",
    color: "#ef4444",
    default_duration_ms: 10_000,
    priority: Priority::High,
    sound: true,
};

const CHAT_MESSAGE: NotificationTypeConfig = NotificationTypeConfig {
    icon: "message-circle",
    color: "#06b6d4",
    default_duration_ms: 4_000,
    priority: Priority::Medium,
    sound: true,
};

/// Look up the static config; unknown types get `DEFAULT`
pub fn type_config(kind: &NotificationType) -> &'static NotificationTypeConfig {
    match kind {
        NotificationType::FriendRequest => &FRIEND_REQUEST,
        NotificationType::FriendRequestAccepted => &FRIEND_REQUEST_ACCEPTED,
        NotificationType::ExpenseCreated
        | NotificationType::ExpenseUpdated
        | NotificationType::ExpenseShared => &EXPENSE,
        NotificationType::ExpenseSettled => &EXPENSE_SETTLED,
        NotificationType::BudgetWarning => &BUDGET_WARNING,
        NotificationType::BudgetExceeded => &BUDGET_EXCEEDED,
        NotificationType::BillReminder | NotificationType::BillDue => &BILL_REMINDER,
        NotificationType::BillOverdue => &BILL_OVERDUE,
        NotificationType::ChatMessage => &CHAT_MESSAGE,
        NotificationType::Other(_) => &DEFAULT,
    }
}
