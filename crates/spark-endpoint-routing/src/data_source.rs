//! 控制器端点数据源。
//!
//! # 教案级说明
//! - **两阶段模型 (What)**：
//!   1. 装配阶段：`add_resolver` / `add_route_entry` 追加解析器与约定路由条目，调用方串行调用；
//!   2. 服务阶段：首次 `endpoints()` 物化快照并写入 `ArcSwapOption`，之后的读者只做一次原子加载。
//! - **缓存策略 (How)**：物化一次、永久缓存。首次物化在执行任何约定之前关闭装配阶段（无论成败）：
//!   之后追加解析器或路由条目返回 [`RoutingError::SetupClosed`]，向已有构建器追加约定返回
//!   [`RoutingError::ConventionsSealed`]，因此缓存无需失效。
//! - **端点顺序**：按映射调用的注册顺序输出。控制器集映射输出其认领的特性路由端点（目录顺序），
//!   约定路由映射输出其约定端点（目录顺序，再按展开顺序）。
//! - **未映射动作**：既未被解析器认领、也不被任何约定路由匹配的动作不可达，仅记录 `debug` 日志。

use std::any::Any;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use spark_endpoint_core::metadata::{
    ACTION_CONTROLLER, ACTION_ID, ACTION_NAME, DATA_TOKEN_PREFIX, ROUTE_NAME, ROUTE_SOURCE,
};
use spark_endpoint_core::{
    ActionCatalog, ActionTarget, CompiledRoute, Endpoint, EndpointBuilder, EndpointSnapshot,
    EndpointSource, Result, RouteValues, RoutingError, TemplateEngine,
};
use tracing::{debug, info};

use crate::conventions::ConventionBuilder;
use crate::resolver::{Resolver, ResolverChain};
use crate::route_table::{ConventionalRouteTable, RouteEntry};

/// 端点数据源：宿主路由构建器按“种类”登记的成员。
pub trait EndpointDataSource: Send + Sync + 'static {
    /// 返回当前端点快照。
    fn endpoints(&self) -> Result<Arc<EndpointSnapshot>>;

    /// 种类名，用于日志与调试输出。
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn as_any(&self) -> &dyn Any;

    /// 擦除为 `Any`，供注册表按具体种类向下转型。
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mapping {
    Controllers(usize),
    Route(usize),
}

/// 物化的输入：解析器链、路由表与映射顺序。克隆只复制句柄。
#[derive(Clone, Debug, Default)]
struct Layout {
    resolvers: ResolverChain,
    routes: ConventionalRouteTable,
    mappings: Vec<Mapping>,
}

#[derive(Debug, Default)]
struct SetupState {
    layout: Layout,
    closed: bool,
    building: Option<ThreadId>,
}

impl SetupState {
    fn ensure_open(&self, operation: &'static str) -> Result<()> {
        if self.closed {
            return Err(RoutingError::SetupClosed {
                operation: Cow::Borrowed(operation),
            });
        }
        Ok(())
    }

    /// 关闭装配阶段并封存全部构建器。
    fn close(&mut self) {
        self.closed = true;
        for resolver in self.layout.resolvers.iter() {
            resolver.owner().seal();
        }
        for entry in self.layout.routes.iter() {
            entry.conventions().seal();
        }
    }
}

/// 物化期间登记当前线程，离开作用域（含展开）时清除。
struct BuildingGuard<'a> {
    setup: &'a Mutex<SetupState>,
}

impl Drop for BuildingGuard<'_> {
    fn drop(&mut self) {
        self.setup.lock().building = None;
    }
}

/// 控制器端点数据源。
///
/// # 教案级说明
/// - **依赖 (What)**：构造时显式注入动作目录与模板引擎，不在运行时查找服务；
/// - **并发 (How)**：装配状态由 `parking_lot::Mutex` 保护；快照由 `ArcSwapOption` 持有，
///   服务阶段的读路径不加锁；
/// - **物化**：在装配锁内关闭装配阶段、封存构建器并复制布局，随后释放装配锁再执行约定，
///   因此约定可以读取本数据源（`route_entries`、`resolve` 等）。并发的首次物化由 `build_gate`
///   串行化，同一线程在约定中再次请求端点得到 [`RoutingError::MaterializationInProgress`]；
/// - **幂等**：每次物化都为每个端点新建 [`EndpointBuilder`] 并从头执行约定，
///   同一份装配状态重复物化得到结构相等的快照。
pub struct ControllerEndpointDataSource {
    actions: Arc<dyn ActionCatalog>,
    templates: Arc<dyn TemplateEngine>,
    setup: Mutex<SetupState>,
    build_gate: Mutex<()>,
    snapshot: ArcSwapOption<EndpointSnapshot>,
}

impl ControllerEndpointDataSource {
    pub fn new(actions: Arc<dyn ActionCatalog>, templates: Arc<dyn TemplateEngine>) -> Self {
        Self {
            actions,
            templates,
            setup: Mutex::new(SetupState::default()),
            build_gate: Mutex::new(()),
            snapshot: ArcSwapOption::empty(),
        }
    }

    /// 追加解析器（控制器集映射）。
    pub fn add_resolver(&self, resolver: Resolver) -> Result<()> {
        let mut setup = self.setup.lock();
        setup.ensure_open("add_resolver")?;
        debug!(resolver = resolver.label(), "resolver registered");
        let index = setup.layout.resolvers.push(resolver);
        setup.layout.mappings.push(Mapping::Controllers(index));
        Ok(())
    }

    /// 追加约定路由条目。
    pub fn add_route_entry(&self, entry: Arc<RouteEntry>) -> Result<()> {
        let mut setup = self.setup.lock();
        setup.ensure_open("add_route_entry")?;
        debug!(
            route = entry.name(),
            template = entry.template(),
            controller_filter = %entry.controller_filter(),
            "conventional route registered"
        );
        let index = setup.layout.routes.push(entry);
        setup.layout.mappings.push(Mapping::Route(index));
        Ok(())
    }

    /// 按注册顺序返回路由条目。
    pub fn route_entries(&self) -> Vec<Arc<RouteEntry>> {
        self.setup.lock().layout.routes.iter().cloned().collect()
    }

    pub fn resolver_count(&self) -> usize {
        self.setup.lock().layout.resolvers.len()
    }

    /// 在当前解析器链上为动作选出所属构建器。
    pub fn resolve(&self, action: &ActionTarget) -> Option<ConventionBuilder> {
        // 谓词在锁外求值。
        let resolvers = self.setup.lock().layout.resolvers.clone();
        resolvers.resolve(action)
    }

    pub fn is_materialized(&self) -> bool {
        self.snapshot.load().is_some()
    }

    fn materialize(&self) -> Result<Arc<EndpointSnapshot>> {
        let current = thread::current().id();
        if self.setup.lock().building == Some(current) {
            return Err(RoutingError::MaterializationInProgress);
        }

        let _gate = self.build_gate.lock();
        if let Some(snapshot) = self.snapshot.load_full() {
            return Ok(snapshot);
        }

        let layout = {
            let mut setup = self.setup.lock();
            setup.close();
            setup.building = Some(current);
            setup.layout.clone()
        };
        let guard = BuildingGuard { setup: &self.setup };
        let built = self.build_snapshot(&layout);
        drop(guard);

        let snapshot = Arc::new(built?);
        self.snapshot.store(Some(Arc::clone(&snapshot)));
        info!(
            endpoints = snapshot.len(),
            routes = layout.routes.len(),
            resolvers = layout.resolvers.len(),
            "endpoint snapshot materialized"
        );
        Ok(snapshot)
    }

    fn build_snapshot(&self, layout: &Layout) -> Result<EndpointSnapshot> {
        let compiled = self.compile_routes(&layout.routes)?;
        let actions = self.actions.actions();

        let mut owned: Vec<Vec<&ActionTarget>> = vec![Vec::new(); layout.resolvers.len()];
        for action in actions.iter().filter(|action| action.is_attribute_routed()) {
            match layout.resolvers.resolve_indexed(action) {
                Some((index, _)) => owned[index].push(action),
                None => debug!(action = %action.id(), "attribute-routed action claimed by no resolver"),
            }
        }

        let mut reached = vec![false; actions.len()];
        let mut endpoints = Vec::new();
        for mapping in &layout.mappings {
            match *mapping {
                Mapping::Controllers(index) => {
                    let Some(resolver) = layout.resolvers.get(index) else {
                        continue;
                    };
                    for action in &owned[index] {
                        endpoints.push(self.attribute_endpoint(action, resolver.owner())?);
                    }
                }
                Mapping::Route(index) => {
                    let (Some(entry), Some(route)) = (layout.routes.get(index), compiled.get(index))
                    else {
                        continue;
                    };
                    for (position, action) in actions.iter().enumerate() {
                        if action.is_attribute_routed()
                            || !entry.controller_filter().accepts(action.controller())
                            || !route.accepts_required_values(action.route_values())
                        {
                            continue;
                        }
                        reached[position] = true;
                        for pattern in route.expand(action.route_values()) {
                            endpoints.push(conventional_endpoint(
                                action, entry, route, pattern, index,
                            ));
                        }
                    }
                }
            }
        }

        for (action, reached) in actions.iter().zip(reached) {
            if !action.is_attribute_routed() && !reached {
                debug!(action = %action.id(), "action is not reachable by any conventional route");
            }
        }

        Ok(EndpointSnapshot::new(endpoints))
    }

    fn compile_routes(&self, routes: &ConventionalRouteTable) -> Result<Vec<CompiledRoute>> {
        let mut names = BTreeSet::new();
        let mut compiled = Vec::with_capacity(routes.len());
        for entry in routes.iter() {
            if !names.insert(entry.name().to_ascii_lowercase()) {
                return Err(RoutingError::DuplicateRouteName {
                    name: entry.name().to_owned(),
                });
            }
            compiled.push(self.templates.compile(
                entry.template(),
                entry.defaults(),
                entry.constraints(),
            )?);
        }
        Ok(compiled)
    }

    fn attribute_endpoint(
        &self,
        action: &ActionTarget,
        owner: &ConventionBuilder,
    ) -> Result<Endpoint> {
        let Some(attribute) = action.attribute_route() else {
            return Err(RoutingError::invalid_argument(
                "action",
                "attribute endpoint requested for a conventionally routed action",
            ));
        };
        let route = self
            .templates
            .compile(&attribute.template, &RouteValues::new(), &RouteValues::new())?;
        let pattern = route
            .expand(action.route_values())
            .into_iter()
            .next()
            .unwrap_or_default();
        let route_name = attribute.name.as_ref().map(|name| name.to_string());

        let mut builder = EndpointBuilder::new(
            pattern,
            action.id().clone(),
            action.id().to_string(),
            attribute.order,
        );
        seed_metadata(&mut builder, action, &EndpointSource::Attribute, route_name.as_deref());
        owner.apply(&mut builder);

        Ok(builder.build(
            route_name,
            EndpointSource::Attribute,
            route.defaults().clone(),
            RouteValues::new(),
        ))
    }
}

fn conventional_endpoint(
    action: &ActionTarget,
    entry: &RouteEntry,
    route: &CompiledRoute,
    pattern: String,
    index: usize,
) -> Endpoint {
    let source = EndpointSource::Conventional {
        route: entry.name().to_owned(),
    };
    let order = i32::try_from(index).unwrap_or(i32::MAX);
    let mut builder = EndpointBuilder::new(pattern, action.id().clone(), action.id().to_string(), order);
    seed_metadata(&mut builder, action, &source, Some(entry.name()));
    for (key, value) in entry.data_tokens() {
        builder
            .metadata
            .insert(format!("{DATA_TOKEN_PREFIX}{key}"), value.to_string());
    }
    entry.conventions().apply(&mut builder);

    builder.build(
        Some(entry.name().to_owned()),
        source,
        route.defaults().clone(),
        entry.data_tokens().clone(),
    )
}

fn seed_metadata(
    builder: &mut EndpointBuilder,
    action: &ActionTarget,
    source: &EndpointSource,
    route_name: Option<&str>,
) {
    let metadata = &mut builder.metadata;
    metadata.insert(ACTION_ID, action.id().to_string());
    metadata.insert(ACTION_CONTROLLER, action.controller().route_name().to_owned());
    metadata.insert(ACTION_NAME, action.action_name().to_owned());
    metadata.insert(ROUTE_SOURCE, source.as_str());
    if let Some(route_name) = route_name {
        metadata.insert(ROUTE_NAME, route_name.to_owned());
    }
}

impl EndpointDataSource for ControllerEndpointDataSource {
    fn endpoints(&self) -> Result<Arc<EndpointSnapshot>> {
        if let Some(snapshot) = self.snapshot.load_full() {
            return Ok(snapshot);
        }
        self.materialize()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl fmt::Debug for ControllerEndpointDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let setup = self.setup.lock();
        f.debug_struct("ControllerEndpointDataSource")
            .field("resolvers", &setup.layout.resolvers.len())
            .field("routes", &setup.layout.routes.len())
            .field("materialized", &self.is_materialized())
            .finish()
    }
}
