use std::borrow::Cow;
use std::collections::{BTreeMap, btree_map};

/// 物化阶段写入的路由名键。
pub const ROUTE_NAME: &str = "route.name";
/// 端点来源键，取值 `attribute` 或 `conventional`。
pub const ROUTE_SOURCE: &str = "route.source";
/// 动作标识键。
pub const ACTION_ID: &str = "action.id";
/// 控制器名键。
pub const ACTION_CONTROLLER: &str = "action.controller";
/// 动作名键。
pub const ACTION_NAME: &str = "action.name";
/// 数据令牌键前缀，完整键为 `data_token.<key>`。
pub const DATA_TOKEN_PREFIX: &str = "data_token.";

/// 端点元数据键，使用 `Cow<'static, str>` 兼顾静态与动态标签。
///
/// # 教案级说明
/// - **契约 (What)**：键名区分大小写，调用方负责保证语义唯一性；
/// - **设计 (How)**：内部持有 `Cow`，允许零拷贝复用静态切片，也支持在运行时分配新字符串。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetadataKey(Cow<'static, str>);

impl MetadataKey {
    /// 基于任意可转换为 `Cow` 的输入创建键名。
    pub fn new<S>(key: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        Self(key.into())
    }

    /// 读取底层字符串切片。
    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }
}

impl From<&'static str> for MetadataKey {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MetadataKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// 端点元数据值。
///
/// - 约定（过滤器、鉴权要求等）以不透明值的形式挂载，核心不解释其含义；
/// - 枚举非穷尽，新增变体不会破坏现有匹配。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[non_exhaustive]
pub enum MetadataValue {
    /// 文本标签。
    Text(Cow<'static, str>),
    /// 整数值。
    Integer(i64),
    /// 开关标记。
    Flag(bool),
    /// 有序值列表，适合同一键挂载多个过滤器或策略名。
    List(Vec<MetadataValue>),
}

impl MetadataValue {
    /// 读取文本值。
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(text) => Some(text.as_ref()),
            _ => None,
        }
    }
}

impl From<&'static str> for MetadataValue {
    fn from(value: &'static str) -> Self {
        Self::Text(Cow::Borrowed(value))
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(Cow::Owned(value))
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// 端点元数据表，使用有序映射以便稳定迭代。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointMetadata(BTreeMap<MetadataKey, MetadataValue>);

impl EndpointMetadata {
    /// 创建空的元数据映射。
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// 插入或覆盖键值对。
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<MetadataValue>
    where
        K: Into<MetadataKey>,
        V: Into<MetadataValue>,
    {
        self.0.insert(key.into(), value.into())
    }

    /// 按键读取。
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(&MetadataKey::new(key.to_owned()))
    }

    /// 删除指定键。
    pub fn remove(&mut self, key: &str) -> Option<MetadataValue> {
        self.0.remove(&MetadataKey::new(key.to_owned()))
    }

    /// 合并另一份元数据，后者覆盖前者。
    pub fn extend(&mut self, other: &EndpointMetadata) {
        for (key, value) in other.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// 以只读方式遍历键值对，遵循有序顺序。
    pub fn iter(&self) -> btree_map::Iter<'_, MetadataKey, MetadataValue> {
        self.0.iter()
    }

    /// 条目数量。
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 检查是否为空。
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_overrides_existing_keys() {
        let mut base = EndpointMetadata::new();
        base.insert("auth.policy", "anonymous");
        base.insert("static.tag", "alpha");

        let mut overlay = EndpointMetadata::new();
        overlay.insert("auth.policy", "admin");

        base.extend(&overlay);
        assert_eq!(base.len(), 2);
        assert_eq!(
            base.get("auth.policy").and_then(MetadataValue::as_text),
            Some("admin")
        );
        assert_eq!(
            base.get("static.tag").and_then(MetadataValue::as_text),
            Some("alpha")
        );
    }
}
