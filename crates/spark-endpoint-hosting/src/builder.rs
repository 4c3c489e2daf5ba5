use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use spark_endpoint_core::{
    ActionCatalog, DefaultParameterPolicyFactory, DefaultTemplateEngine, EndpointSnapshot,
    ParameterPolicyFactory, Result, RoutingError, TemplateEngine,
};
use spark_endpoint_routing::{ControllerEndpointDataSource, EndpointDataSource};
use tracing::debug;

/// 数据源所需的共享依赖，构造时显式提供。
///
/// # 教案级注释
/// - **契约 (What)**：动作目录为必需依赖；模板引擎缺省为使用
///   [`DefaultParameterPolicyFactory`] 的 [`DefaultTemplateEngine`]；
/// - **错误 (What)**：经 [`RoutingServices::builder`] 装配且未提供动作目录时，`build` 返回
///   [`RoutingError::UnresolvedDependency`]，调用方应中止启动。
#[derive(Clone)]
pub struct RoutingServices {
    action_catalog: Arc<dyn ActionCatalog>,
    template_engine: Arc<dyn TemplateEngine>,
}

impl RoutingServices {
    pub fn new(
        action_catalog: Arc<dyn ActionCatalog>,
        template_engine: Arc<dyn TemplateEngine>,
    ) -> Self {
        Self {
            action_catalog,
            template_engine,
        }
    }

    pub fn builder() -> RoutingServicesBuilder {
        RoutingServicesBuilder::default()
    }

    pub fn action_catalog(&self) -> &Arc<dyn ActionCatalog> {
        &self.action_catalog
    }

    pub fn template_engine(&self) -> &Arc<dyn TemplateEngine> {
        &self.template_engine
    }
}

impl fmt::Debug for RoutingServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingServices").finish_non_exhaustive()
    }
}

/// [`RoutingServices`] 的分步装配器。
#[derive(Default)]
pub struct RoutingServicesBuilder {
    action_catalog: Option<Arc<dyn ActionCatalog>>,
    template_engine: Option<Arc<dyn TemplateEngine>>,
    parameter_policies: Option<Arc<dyn ParameterPolicyFactory>>,
}

impl RoutingServicesBuilder {
    pub fn with_action_catalog(mut self, catalog: Arc<dyn ActionCatalog>) -> Self {
        self.action_catalog = Some(catalog);
        self
    }

    /// 替换模板引擎；设置后 `with_parameter_policies` 不再生效。
    pub fn with_template_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.template_engine = Some(engine);
        self
    }

    /// 为默认模板引擎注入约束策略工厂。
    pub fn with_parameter_policies(mut self, policies: Arc<dyn ParameterPolicyFactory>) -> Self {
        self.parameter_policies = Some(policies);
        self
    }

    pub fn build(self) -> Result<RoutingServices> {
        let action_catalog =
            self.action_catalog
                .ok_or(RoutingError::UnresolvedDependency {
                    dependency: Cow::Borrowed("action_catalog"),
                })?;
        let template_engine = match self.template_engine {
            Some(engine) => engine,
            None => {
                let policies = self
                    .parameter_policies
                    .unwrap_or_else(|| Arc::new(DefaultParameterPolicyFactory));
                Arc::new(DefaultTemplateEngine::new(policies))
            }
        };
        Ok(RoutingServices::new(action_catalog, template_engine))
    }
}

/// 按种类登记的数据源注册表：每个种类至多一个实例，保留登记顺序。
#[derive(Default)]
pub struct DataSourceRegistry {
    entries: Vec<(TypeId, Arc<dyn EndpointDataSource>)>,
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记数据源；同一种类重复登记返回 [`RoutingError::InvalidArgument`]。
    pub fn register<T: EndpointDataSource>(&mut self, source: Arc<T>) -> Result<()> {
        let kind = TypeId::of::<T>();
        if self.entries.iter().any(|(existing, _)| *existing == kind) {
            return Err(RoutingError::invalid_argument(
                "data_source",
                format!("a data source of kind `{}` is already registered", source.kind()),
            ));
        }
        self.entries.push((kind, source));
        Ok(())
    }

    /// 按种类查找。
    pub fn find<T: EndpointDataSource>(&self) -> Option<Arc<T>> {
        let kind = TypeId::of::<T>();
        self.entries
            .iter()
            .find(|(existing, _)| *existing == kind)
            .and_then(|(_, source)| Arc::clone(source).into_any().downcast::<T>().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn EndpointDataSource>> {
        self.entries.iter().map(|(_, source)| source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for DataSourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.iter().map(|source| source.kind()).collect();
        f.debug_struct("DataSourceRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

/// 宿主侧的端点路由构建器。
///
/// # 教案级注释
/// - **体系位置 (Where)**：由应用启动例程创建并显式传递，持有数据源注册表与共享依赖；
///   不存在隐式的全局可变状态；
/// - **生命周期 (How)**：装配阶段通过 [`EndpointRouteBuilderExt`](crate::EndpointRouteBuilderExt)
///   登记映射；服务阶段调用 [`Self::endpoints`] 汇总所有数据源的快照；
/// - **契约 (What)**：同一构建器内同种数据源至多一个，见 [`find_or_create_data_source`]；
///   汇总快照以 `Arc` 缓存，读者共享同一份，注册表变化时失效。
pub struct EndpointRouteBuilder {
    services: RoutingServices,
    data_sources: DataSourceRegistry,
    combined: ArcSwapOption<EndpointSnapshot>,
}

impl EndpointRouteBuilder {
    pub fn new(services: RoutingServices) -> Self {
        Self {
            services,
            data_sources: DataSourceRegistry::new(),
            combined: ArcSwapOption::empty(),
        }
    }

    pub fn services(&self) -> &RoutingServices {
        &self.services
    }

    pub fn data_sources(&self) -> &DataSourceRegistry {
        &self.data_sources
    }

    /// 登记额外的数据源。
    pub fn add_data_source<T: EndpointDataSource>(&mut self, source: Arc<T>) -> Result<&mut Self> {
        self.data_sources.register(source)?;
        self.combined.store(None);
        Ok(self)
    }

    /// 按登记顺序拼接全部数据源的端点。
    ///
    /// 首次调用会物化各数据源，任何物化错误（重名路由、非法模板）在此处暴露。
    /// 只有一个数据源时直接返回其快照；多个时拼接一次并缓存。
    pub fn endpoints(&self) -> Result<Arc<EndpointSnapshot>> {
        if let Some(combined) = self.combined.load_full() {
            return Ok(combined);
        }

        let snapshots = self
            .data_sources
            .iter()
            .map(|source| source.endpoints())
            .collect::<Result<Vec<_>>>()?;
        let combined = match <[Arc<EndpointSnapshot>; 1]>::try_from(snapshots) {
            Ok([only]) => only,
            Err(snapshots) => Arc::new(EndpointSnapshot::new(
                snapshots
                    .iter()
                    .flat_map(|snapshot| snapshot.iter().cloned())
                    .collect(),
            )),
        };
        self.combined.store(Some(Arc::clone(&combined)));
        Ok(combined)
    }
}

impl fmt::Debug for EndpointRouteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointRouteBuilder")
            .field("services", &self.services)
            .field("data_sources", &self.data_sources)
            .field("cached", &self.combined.load().is_some())
            .finish()
    }
}

/// 查找构建器中已登记的控制器端点数据源，不存在时创建并登记。
///
/// - 幂等：重复调用返回同一实例，注册表中该种类始终只有一个；
/// - 新实例以构建器持有的 [`RoutingServices`] 显式构造。
pub fn find_or_create_data_source(
    builder: &mut EndpointRouteBuilder,
) -> Arc<ControllerEndpointDataSource> {
    if let Some(existing) = builder.data_sources.find::<ControllerEndpointDataSource>() {
        return existing;
    }

    let created = Arc::new(ControllerEndpointDataSource::new(
        Arc::clone(builder.services.action_catalog()),
        Arc::clone(builder.services.template_engine()),
    ));
    let kind = TypeId::of::<ControllerEndpointDataSource>();
    builder.data_sources.entries.push((kind, created.clone()));
    builder.combined.store(None);
    debug!("controller endpoint data source created");
    created
}
