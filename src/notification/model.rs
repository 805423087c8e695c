//! 通知数据模型 - 外部通知存储推送过来的快照条目

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::{NotificationType, NotificationTypeConfig};

/// 通知关联的业务对象（全部可选，由通知类型决定填哪个）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "expenseId")]
    pub expense_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "budgetId")]
    pub budget_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "billId")]
    pub bill_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "chatId")]
    pub chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "senderId")]
    pub sender_id: Option<String>,
}

impl NotificationPayload {
    /// 第一个非空的引用 ID（用于导航深链）
    pub fn reference_id(&self) -> Option<&str> {
        self.expense_id
            .as_deref()
            .or(self.budget_id.as_deref())
            .or(self.bill_id.as_deref())
            .or(self.chat_id.as_deref())
            .or(self.sender_id.as_deref())
    }
}

/// 单条通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// 稳定且唯一的 ID
    pub id: String,
    /// 通知类型
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// 业务引用
    #[serde(default)]
    pub payload: NotificationPayload,
    /// 是否已读
    #[serde(default, alias = "isRead")]
    pub is_read: bool,
    /// 展示文本
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 创建时间
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// 创建未读通知
    pub fn new(id: impl Into<String>, kind: impl Into<NotificationType>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            payload: NotificationPayload::default(),
            is_read: false,
            message: None,
            created_at: None,
        }
    }

    /// 设置 payload
    pub fn with_payload(mut self, payload: NotificationPayload) -> Self {
        self.payload = payload;
        self
    }

    /// 设置文本
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// 标记为已读
    pub fn read(mut self) -> Self {
        self.is_read = true;
        self
    }

    pub fn type_config(&self) -> &'static NotificationTypeConfig {
        self.kind.config()
    }
}

/// 通知快照：外部存储当前的通知列表，顺序即到达顺序
pub type NotificationSnapshot = Vec<Notification>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case_snapshot_entry() {
        let json = r#"{"id":"n-1","type":"EXPENSE_SHARED","isRead":false,
            "payload":{"expenseId":"e-42"},"createdAt":"2026-02-24T08:20:52Z"}"#;
        let n: Notification = serde_json::from_str(json).unwrap();

        assert_eq!(n.id, "n-1");
        assert_eq!(n.kind, NotificationType::ExpenseShared);
        assert!(!n.is_read);
        assert_eq!(n.payload.expense_id.as_deref(), Some("e-42"));
        assert!(n.created_at.is_some());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let n: Notification = serde_json::from_str(r#"{"id":"n-2","type":"chat_message"}"#).unwrap();
        assert!(!n.is_read);
        assert_eq!(n.payload, NotificationPayload::default());
        assert!(n.message.is_none());
    }

    #[test]
    fn test_reference_id_prefers_first_present() {
        let payload = NotificationPayload {
            bill_id: Some("b-1".to_string()),
            sender_id: Some("u-9".to_string()),
            ..Default::default()
        };
        assert_eq!(payload.reference_id(), Some("b-1"));
        assert_eq!(NotificationPayload::default().reference_id(), None);
    }

    #[test]
    fn test_builder_chain() {
        let n = Notification::new("n-3", "budget_exceeded")
            .with_message("Groceries over budget")
            .read();
        assert!(n.is_read);
        assert_eq!(n.message.as_deref(), Some("Groceries over budget"));
        assert_eq!(n.type_config().icon, "alert-octagon");
    }
}
