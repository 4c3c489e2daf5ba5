use std::sync::Arc;

use spark_endpoint_core::{Convention, Result, RouteValues, TypeCapability};

use crate::conventions::{ConventionBuilder, EndpointConventionBuilder};

/// 约定路由条目的可选配置。
///
/// 所有字段均带默认值：空的 `defaults`/`constraints`/`data_tokens`，以及接受任意控制器的基础能力。
/// 较短的注册形式即以省略字段取默认值的方式构造本结构。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteEntryOptions {
    pub defaults: RouteValues,
    pub constraints: RouteValues,
    pub data_tokens: RouteValues,
    pub controller_filter: TypeCapability,
}

impl RouteEntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(mut self, defaults: RouteValues) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_constraints(mut self, constraints: RouteValues) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_data_tokens(mut self, data_tokens: RouteValues) -> Self {
        self.data_tokens = data_tokens;
        self
    }

    pub fn with_controller_filter(mut self, controller_filter: TypeCapability) -> Self {
        self.controller_filter = controller_filter;
        self
    }
}

/// 集中声明的约定路由条目。
///
/// # 教案级说明
/// - **契约 (What)**：
///   - `name` 在路由表内应唯一，本结构不校验，重名在物化时由模板编译阶段报告；
///   - `template` 原样交给模板引擎；
///   - 条目本身即约定构建器：通过 [`EndpointConventionBuilder`] 追加的约定只作用于本条目产生的端点。
/// - **生命周期 (How)**：注册后只追加、不修改；数据源与调用方通过 `Arc` 共享同一条目。
#[derive(Debug)]
pub struct RouteEntry {
    name: String,
    template: String,
    options: RouteEntryOptions,
    conventions: ConventionBuilder,
}

impl RouteEntry {
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        options: RouteEntryOptions,
    ) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            options,
            conventions: ConventionBuilder::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn defaults(&self) -> &RouteValues {
        &self.options.defaults
    }

    pub fn constraints(&self) -> &RouteValues {
        &self.options.constraints
    }

    pub fn data_tokens(&self) -> &RouteValues {
        &self.options.data_tokens
    }

    pub fn controller_filter(&self) -> &TypeCapability {
        &self.options.controller_filter
    }

    pub fn options(&self) -> &RouteEntryOptions {
        &self.options
    }

    /// 本条目的约定构建器。
    pub fn conventions(&self) -> &ConventionBuilder {
        &self.conventions
    }
}

impl EndpointConventionBuilder for RouteEntry {
    fn add(&self, convention: Convention) -> Result<()> {
        self.conventions.add(convention)
    }
}

/// 有序的约定路由表：只追加，保持注册顺序。
#[derive(Clone, Debug, Default)]
pub struct ConventionalRouteTable {
    entries: Vec<Arc<RouteEntry>>,
}

impl ConventionalRouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加条目，返回其位置。
    pub fn push(&mut self, entry: Arc<RouteEntry>) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Arc<RouteEntry>> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<RouteEntry>> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_options_default_to_base_capability() {
        let entry = RouteEntry::new("default", "{controller}/{action}/{id?}", RouteEntryOptions::new());
        assert!(entry.defaults().is_empty());
        assert!(entry.constraints().is_empty());
        assert!(entry.data_tokens().is_empty());
        assert_eq!(entry.controller_filter(), &TypeCapability::base());
    }

    #[test]
    fn entry_is_a_convention_builder() {
        let entry = RouteEntry::new("default", "{controller}/{action}", RouteEntryOptions::new());
        entry.with_metadata("area", "public").unwrap();
        assert_eq!(entry.conventions().len(), 1);
    }

    #[test]
    fn table_preserves_registration_order() {
        let mut table = ConventionalRouteTable::new();
        for name in ["b", "a", "c"] {
            table.push(Arc::new(RouteEntry::new(name, "{controller}", RouteEntryOptions::new())));
        }
        assert_eq!(table.names().collect::<Vec<_>>(), ["b", "a", "c"]);
    }
}
