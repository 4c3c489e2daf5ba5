use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, btree_map};
use std::fmt;

/// 路由参数名。
///
/// # 教案级说明
/// - **契约 (What)**：比较与排序均按 ASCII 大小写不敏感进行，但保留调用方提供的原始拼写，
///   因此 `{Controller}` 与 `controller` 指向同一参数；
/// - **设计 (How)**：内部持有 `Cow<'static, str>`，静态键零拷贝，配置加载的键按需分配。
#[derive(Clone, Debug)]
pub struct RouteKey(Cow<'static, str>);

impl RouteKey {
    /// 基于任意可转换为 `Cow` 的输入创建键名。
    pub fn new<S>(key: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        Self(key.into())
    }

    /// 读取原始拼写。
    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }
}

impl PartialEq for RouteKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for RouteKey {}

impl PartialOrd for RouteKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RouteKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.0.bytes().map(|b| b.to_ascii_lowercase());
        let rhs = other.0.bytes().map(|b| b.to_ascii_lowercase());
        lhs.cmp(rhs)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&'static str> for RouteKey {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RouteKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// 路由值：字面量或模板引擎可识别的标记对象。
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum RouteValue {
    /// 文本字面量。
    Text(Cow<'static, str>),
    /// 整数字面量。
    Integer(i64),
    /// 布尔字面量。
    Bool(bool),
    /// “可选参数”标记，声明某参数在 URL 中可以缺省。
    Optional,
}

impl RouteValue {
    /// 构造文本值。
    pub fn text<S>(value: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        Self::Text(value.into())
    }

    /// 以文本形式呈现字面量；[`RouteValue::Optional`] 没有文本形式。
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            RouteValue::Text(text) => Some(Cow::Borrowed(text.as_ref())),
            RouteValue::Integer(value) => Some(Cow::Owned(value.to_string())),
            RouteValue::Bool(value) => Some(Cow::Borrowed(if *value { "true" } else { "false" })),
            RouteValue::Optional => None,
        }
    }

    /// 判断是否为空文本或可选标记。
    pub fn is_empty(&self) -> bool {
        match self {
            RouteValue::Text(text) => text.is_empty(),
            RouteValue::Optional => true,
            RouteValue::Integer(_) | RouteValue::Bool(_) => false,
        }
    }

    /// 按文本形式、大小写不敏感地比较两个路由值。
    ///
    /// 两侧均为空（空文本或可选标记）时视为相等。
    pub fn values_equal(lhs: &RouteValue, rhs: &RouteValue) -> bool {
        match (lhs.as_text(), rhs.as_text()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(&b),
            _ => lhs.is_empty() && rhs.is_empty(),
        }
    }
}

impl fmt::Display for RouteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("<optional>"),
        }
    }
}

impl From<&'static str> for RouteValue {
    fn from(value: &'static str) -> Self {
        Self::Text(Cow::Borrowed(value))
    }
}

impl From<String> for RouteValue {
    fn from(value: String) -> Self {
        Self::Text(Cow::Owned(value))
    }
}

impl From<i64> for RouteValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for RouteValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// 路由值映射，对应 `defaults`、`constraints`、`dataTokens` 三类配置对象。
///
/// # 教案级说明
/// - **契约 (What)**：键大小写不敏感；重复插入以后者为准；迭代顺序为键序，
///   因而相同键值对以任意顺序构造出的映射彼此相等；
/// - **设计 (How)**：使用 `BTreeMap` 保持确定性，便于端点快照做结构化比较。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteValues(BTreeMap<RouteKey, RouteValue>);

impl RouteValues {
    /// 创建空映射。
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// 插入或覆盖一个值，返回旧值。
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<RouteValue>
    where
        K: Into<RouteKey>,
        V: Into<RouteValue>,
    {
        self.0.insert(key.into(), value.into())
    }

    /// 按参数名查询（大小写不敏感）。
    pub fn get(&self, key: &str) -> Option<&RouteValue> {
        self.0.get(&RouteKey::new(key.to_owned()))
    }

    /// 判断是否包含指定参数名。
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 按键序遍历。
    pub fn iter(&self) -> btree_map::Iter<'_, RouteKey, RouteValue> {
        self.0.iter()
    }

    /// 条目数量。
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RouteValues
where
    K: Into<RouteKey>,
    V: Into<RouteValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = RouteValues::new();
        for (key, value) in iter {
            values.insert(key, value);
        }
        values
    }
}

impl<'a> IntoIterator for &'a RouteValues {
    type Item = (&'a RouteKey, &'a RouteValue);
    type IntoIter = btree_map::Iter<'a, RouteKey, RouteValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
