//! 通知偏好解析
//!
//! 原始偏好对象由外部偏好服务提供，可能尚未加载（`None`）。
//! 解析结果决定浮动通知是否启用、是否播放提示音、以及每种类型是否走浮动通知渠道。
//!
//! # 失败开放
//! `delivery_methods` 是一段 JSON 字符串。缺失或损坏时视为“该类型启用”，
//! 并记录警告，避免一份坏配置悄无声息地屏蔽所有通知。

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::kind::NotificationType;

/// 当前 schema 版本
pub const DELIVERY_SCHEMA_VERSION: u32 = 2;

/// 视为浮动通知渠道的名称
const IN_APP_CHANNELS: &[&str] = &["in_app", "inapp", "floating"];

/// 原始偏好（字段均可缺失，缺失与显式值语义不同）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceSet {
    #[serde(default)]
    pub master_enabled: Option<bool>,
    #[serde(default)]
    pub do_not_disturb: Option<bool>,
    #[serde(default)]
    pub notification_sound: Option<bool>,
    #[serde(default)]
    pub floating_notifications_enabled: Option<bool>,
    /// JSON 编码的 `type -> [channel, ...]`
    #[serde(default, alias = "deliveryMethodsJson")]
    pub delivery_methods: Option<String>,
}

impl PreferenceSet {
    /// 全部开启的偏好（测试和 CLI 默认值）
    pub fn all_enabled() -> Self {
        Self {
            master_enabled: Some(true),
            do_not_disturb: Some(false),
            notification_sound: Some(true),
            floating_notifications_enabled: Some(true),
            delivery_methods: None,
        }
    }
}

/// 解码后的投递渠道表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryMethods {
    pub version: u32,
    pub methods: HashMap<String, Vec<String>>,
}

/// v2 包装格式
#[derive(Deserialize)]
struct VersionedDelivery {
    version: u32,
    #[serde(default)]
    methods: HashMap<String, Vec<String>>,
}

/// 解码结果，永远不会失败
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryDecode {
    /// 成功解码
    Decoded(DeliveryMethods),
    /// 没有配置
    Empty,
    /// 无法解析（原因）
    Malformed(String),
}

impl DeliveryMethods {
    /// 解码 JSON 字符串
    ///
    /// 支持两种格式：
    /// - v1：裸 map `{"chat_message": ["in_app", "email"]}`
    /// - v2：`{"version": 2, "methods": {...}}`
    pub fn decode(raw: Option<&str>) -> DeliveryDecode {
        let raw = match raw.map(str::trim) {
            None | Some("") | Some("null") => return DeliveryDecode::Empty,
            Some(raw) => raw,
        };

        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => return DeliveryDecode::Malformed(e.to_string()),
        };

        match Self::from_value(value) {
            Ok(methods) => DeliveryDecode::Decoded(methods),
            Err(e) => DeliveryDecode::Malformed(e.to_string()),
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        if value.get("version").is_some() {
            let versioned: VersionedDelivery = serde_json::from_value(value)?;
            if versioned.version > DELIVERY_SCHEMA_VERSION {
                anyhow::bail!("unsupported delivery schema version {}", versioned.version);
            }
            return Ok(Self::normalized(versioned.version, versioned.methods));
        }

        let methods: HashMap<String, Vec<String>> = serde_json::from_value(value)?;
        Ok(Self::normalized(1, methods))
    }

    /// key 统一成规范类型名，便于按 `NotificationType` 查询
    fn normalized(version: u32, methods: HashMap<String, Vec<String>>) -> Self {
        let methods = methods
            .into_iter()
            .map(|(k, v)| (NotificationType::parse(&k).as_str().to_string(), v))
            .collect();
        Self { version, methods }
    }

    /// 某类型的渠道列表（未配置返回 `None`）
    pub fn channels_for(&self, kind: &NotificationType) -> Option<&[String]> {
        self.methods.get(kind.as_str()).map(Vec::as_slice)
    }
}

/// 解析后的有效偏好
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPreferences {
    pub enabled: bool,
    pub sound_enabled: bool,
    delivery: DeliveryDecode,
}

impl ResolvedPreferences {
    /// 从原始偏好解析（`None` 表示尚未加载）
    pub fn resolve(preferences: Option<&PreferenceSet>) -> Self {
        let Some(prefs) = preferences else {
            return Self {
                enabled: false,
                sound_enabled: false,
                delivery: DeliveryDecode::Empty,
            };
        };

        let enabled = prefs.master_enabled != Some(false)
            && prefs.floating_notifications_enabled != Some(false)
            && prefs.do_not_disturb != Some(true);
        let sound_enabled = prefs.notification_sound == Some(true) && prefs.master_enabled != Some(false);

        let delivery = DeliveryMethods::decode(prefs.delivery_methods.as_deref());
        if let DeliveryDecode::Malformed(reason) = &delivery {
            warn!(error = %reason, "Malformed delivery methods, treating all types as enabled");
        }

        Self {
            enabled,
            sound_enabled,
            delivery,
        }
    }

    /// 该类型是否走浮动通知
    ///
    /// 只有明确配置且不含 in-app 渠道时才返回 `false`
    pub fn is_type_enabled(&self, kind: &NotificationType) -> bool {
        let methods = match &self.delivery {
            DeliveryDecode::Decoded(methods) => methods,
            DeliveryDecode::Empty | DeliveryDecode::Malformed(_) => return true,
        };

        match methods.channels_for(kind) {
            None => true,
            Some(channels) => {
                let enabled = channels
                    .iter()
                    .any(|c| IN_APP_CHANNELS.contains(&c.trim().to_lowercase().as_str()));
                if !enabled {
                    debug!(kind = %kind, ?channels, "Floating delivery disabled for type");
                }
                enabled
            }
        }
    }

    pub fn delivery(&self) -> &DeliveryDecode {
        &self.delivery
    }
}

/// 外部偏好服务（HTTP / 本地存储等）
pub trait PreferenceService: Send + Sync {
    fn fetch(&self) -> Result<PreferenceSet>;
}

/// 偏好加载状态：只请求一次，失败后允许有限次重试
#[derive(Debug, Clone)]
pub struct PreferenceLoader {
    loading: bool,
    attempted: bool,
    retries_left: u32,
}

impl PreferenceLoader {
    pub fn new(retries: u32) -> Self {
        Self {
            loading: false,
            attempted: false,
            retries_left: retries,
        }
    }

    /// 偏好缺失时是否应该发起请求；返回 `true` 时状态已切换为加载中
    pub fn should_fetch(&mut self, has_preferences: bool) -> bool {
        if has_preferences || self.loading || self.attempted {
            return false;
        }
        self.loading = true;
        self.attempted = true;
        true
    }

    /// 加载成功
    pub fn on_loaded(&mut self) {
        self.loading = false;
    }

    /// 加载失败：还有重试额度时清除 attempted 标志
    pub fn on_failed(&mut self) {
        self.loading = false;
        if self.retries_left > 0 {
            self.retries_left -= 1;
            self.attempted = false;
        }
    }

    /// 外部已经在加载（例如其它组件发起的请求）
    pub fn on_loading(&mut self) {
        self.loading = true;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

impl Default for PreferenceLoader {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs() -> PreferenceSet {
        PreferenceSet::all_enabled()
    }

    #[test]
    fn test_missing_preferences_disable_everything() {
        let resolved = ResolvedPreferences::resolve(None);
        assert!(!resolved.enabled);
        assert!(!resolved.sound_enabled);
    }

    #[test]
    fn test_unset_flags_mean_enabled() {
        // 字段缺失 != false
        let resolved = ResolvedPreferences::resolve(Some(&PreferenceSet::default()));
        assert!(resolved.enabled);
        // 提示音必须显式开启
        assert!(!resolved.sound_enabled);
    }

    #[test]
    fn test_master_switch_disables() {
        let p = PreferenceSet {
            master_enabled: Some(false),
            ..prefs()
        };
        let resolved = ResolvedPreferences::resolve(Some(&p));
        assert!(!resolved.enabled);
        assert!(!resolved.sound_enabled);
    }

    #[test]
    fn test_do_not_disturb_disables_but_keeps_sound_flag() {
        let p = PreferenceSet {
            do_not_disturb: Some(true),
            ..prefs()
        };
        let resolved = ResolvedPreferences::resolve(Some(&p));
        assert!(!resolved.enabled);
        assert!(resolved.sound_enabled);
    }

    #[test]
    fn test_floating_switch_disables() {
        let p = PreferenceSet {
            floating_notifications_enabled: Some(false),
            ..prefs()
        };
        assert!(!ResolvedPreferences::resolve(Some(&p)).enabled);
    }

    #[test]
    fn test_type_enabled_v1_map() {
        let p = PreferenceSet {
            delivery_methods: Some(r#"{"chat_message": ["email"], "BILL_DUE": ["in_app"]}"#.to_string()),
            ..prefs()
        };
        let resolved = ResolvedPreferences::resolve(Some(&p));

        assert!(!resolved.is_type_enabled(&NotificationType::ChatMessage));
        assert!(resolved.is_type_enabled(&NotificationType::BillDue));
        // 未配置的类型默认启用
        assert!(resolved.is_type_enabled(&NotificationType::FriendRequest));
    }

    #[test]
    fn test_type_enabled_v2_schema() {
        let p = PreferenceSet {
            delivery_methods: Some(
                r#"{"version": 2, "methods": {"budget_exceeded": ["Floating", "push"], "expense_created": []}}"#
                    .to_string(),
            ),
            ..prefs()
        };
        let resolved = ResolvedPreferences::resolve(Some(&p));

        assert!(resolved.is_type_enabled(&NotificationType::BudgetExceeded));
        assert!(!resolved.is_type_enabled(&NotificationType::ExpenseCreated));
        match resolved.delivery() {
            DeliveryDecode::Decoded(m) => assert_eq!(m.version, 2),
            other => panic!("unexpected decode: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json_fails_open() {
        let p = PreferenceSet {
            delivery_methods: Some("{not json".to_string()),
            ..prefs()
        };
        let resolved = ResolvedPreferences::resolve(Some(&p));

        assert!(matches!(resolved.delivery(), DeliveryDecode::Malformed(_)));
        assert!(resolved.is_type_enabled(&NotificationType::ChatMessage));
        assert!(resolved.is_type_enabled(&NotificationType::Other("x".to_string())));
    }

    #[test]
    fn test_wrong_shape_fails_open() {
        // 合法 JSON 但结构不对
        assert!(matches!(
            DeliveryMethods::decode(Some(r#"["in_app"]"#)),
            DeliveryDecode::Malformed(_)
        ));
        assert!(matches!(
            DeliveryMethods::decode(Some(r#"{"version": 99, "methods": {}}"#)),
            DeliveryDecode::Malformed(_)
        ));
    }

    #[test]
    fn test_empty_delivery_methods() {
        assert_eq!(DeliveryMethods::decode(None), DeliveryDecode::Empty);
        assert_eq!(DeliveryMethods::decode(Some("  ")), DeliveryDecode::Empty);
        assert_eq!(DeliveryMethods::decode(Some("null")), DeliveryDecode::Empty);
    }

    #[test]
    fn test_preference_set_camel_case() {
        let json = r#"{"masterEnabled":true,"doNotDisturb":false,"notificationSound":true,
            "floatingNotificationsEnabled":true,"deliveryMethods":"{}"}"#;
        let p: PreferenceSet = serde_json::from_str(json).unwrap();
        assert_eq!(p.master_enabled, Some(true));
        assert_eq!(p.delivery_methods.as_deref(), Some("{}"));
    }

    #[test]
    fn test_loader_fetches_once() {
        let mut loader = PreferenceLoader::default();
        assert!(loader.should_fetch(false));
        // 加载中不会再次请求
        assert!(!loader.should_fetch(false));
        loader.on_loaded();
        // 已尝试过
        assert!(!loader.should_fetch(false));
    }

    #[test]
    fn test_loader_skips_when_present() {
        let mut loader = PreferenceLoader::default();
        assert!(!loader.should_fetch(true));
    }

    #[test]
    fn test_loader_allows_exactly_one_retry() {
        let mut loader = PreferenceLoader::default();
        assert!(loader.should_fetch(false));
        loader.on_failed();

        // 第一次失败后允许重试
        assert!(loader.should_fetch(false));
        loader.on_failed();

        // 第二次失败后不再请求
        assert!(!loader.should_fetch(false));
        assert!(!loader.is_loading());
    }

    #[test]
    fn test_loader_respects_external_loading() {
        let mut loader = PreferenceLoader::default();
        loader.on_loading();
        assert!(!loader.should_fetch(false));
    }
}
