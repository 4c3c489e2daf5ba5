use std::fmt;
use std::sync::Arc;

use crate::action::ActionId;
use crate::metadata::EndpointMetadata;
use crate::values::RouteValues;

/// 约定：在端点可供服务前对其元数据执行的一次变更。
///
/// 约定在注册阶段登记，物化时才按登记顺序作用于每个匹配的端点，每个端点恰好执行一次。
pub type Convention = Arc<dyn Fn(&mut EndpointBuilder) + Send + Sync>;

/// 端点来源。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndpointSource {
    /// 特性路由：模板静态声明在动作上。
    Attribute,
    /// 约定路由：来自指定名称的路由条目。
    Conventional { route: String },
}

impl EndpointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointSource::Attribute => "attribute",
            EndpointSource::Conventional { .. } => "conventional",
        }
    }
}

/// 约定可见的可变端点视图。
///
/// # 教案级说明
/// - **契约 (What)**：约定只能改写显示名、排序值与元数据；模式与目标在物化开始时即已确定，仅可读；
/// - **生命周期 (How)**：每次物化为每个端点新建一个构建器，约定执行完毕后冻结为 [`Endpoint`]。
#[derive(Clone, Debug)]
pub struct EndpointBuilder {
    pattern: String,
    target: ActionId,
    pub display_name: String,
    pub order: i32,
    pub metadata: EndpointMetadata,
}

impl EndpointBuilder {
    pub fn new(pattern: String, target: ActionId, display_name: String, order: i32) -> Self {
        Self {
            pattern,
            target,
            display_name,
            order,
            metadata: EndpointMetadata::new(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn target(&self) -> &ActionId {
        &self.target
    }

    /// 冻结为不可变端点。
    pub fn build(
        self,
        route_name: Option<String>,
        source: EndpointSource,
        defaults: RouteValues,
        data_tokens: RouteValues,
    ) -> Endpoint {
        Endpoint {
            display_name: self.display_name,
            pattern: self.pattern,
            order: self.order,
            target: self.target,
            route_name,
            source,
            defaults,
            data_tokens,
            metadata: self.metadata,
        }
    }
}

/// 物化产物：模式 + 元数据 + 目标引用。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    display_name: String,
    pattern: String,
    order: i32,
    target: ActionId,
    route_name: Option<String>,
    source: EndpointSource,
    defaults: RouteValues,
    data_tokens: RouteValues,
    metadata: EndpointMetadata,
}

impl Endpoint {
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// 可匹配的路由模式文本。
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn target(&self) -> &ActionId {
        &self.target
    }

    pub fn route_name(&self) -> Option<&str> {
        self.route_name.as_deref()
    }

    pub fn source(&self) -> &EndpointSource {
        &self.source
    }

    pub fn defaults(&self) -> &RouteValues {
        &self.defaults
    }

    pub fn data_tokens(&self) -> &RouteValues {
        &self.data_tokens
    }

    pub fn metadata(&self) -> &EndpointMetadata {
        &self.metadata
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => /{}", self.display_name, self.pattern)
    }
}

/// 端点快照：物化后的不可变有序端点序列，可在并发请求间共享。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointSnapshot {
    endpoints: Vec<Endpoint>,
}

impl EndpointSnapshot {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Endpoint> {
        self.endpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// 指定动作的全部端点，保持快照顺序。
    pub fn for_action<'a>(&'a self, action: &'a ActionId) -> impl Iterator<Item = &'a Endpoint> {
        self.endpoints
            .iter()
            .filter(move |endpoint| endpoint.target() == action)
    }

    /// 指定路由名下的全部端点。
    pub fn named<'a>(&'a self, route_name: &'a str) -> impl Iterator<Item = &'a Endpoint> {
        self.endpoints
            .iter()
            .filter(move |endpoint| endpoint.route_name() == Some(route_name))
    }
}

impl<'a> IntoIterator for &'a EndpointSnapshot {
    type Item = &'a Endpoint;
    type IntoIter = std::slice::Iter<'a, Endpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.endpoints.iter()
    }
}
