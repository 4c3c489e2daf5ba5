//! 端点注册入口。
//!
//! # 教案级说明
//! - **两类映射 (What)**：控制器集映射（`map_controllers*`、`map_controller`、`map_assembly`）
//!   向解析器链追加一个解析器并返回其 [`ConventionBuilder`]；约定路由映射（`map_route*`）
//!   向路由表追加一个 [`RouteEntry`] 并返回条目本身；
//! - **委托关系 (How)**：所有控制器集入口都落到 [`EndpointRouteBuilderExt::map_controllers_for`]，
//!   `map_route` 仅以默认 [`RouteEntryOptions`] 调用 [`EndpointRouteBuilderExt::map_route_with`]，
//!   较短的入口不重复任何逻辑；
//! - **参数校验**：空路由名、空程序集名在接触任何状态（包括查找或创建数据源）之前失败，
//!   返回 [`RoutingError::InvalidArgument`]。

use std::borrow::Cow;
use std::sync::Arc;

use spark_endpoint_core::{Controller, ControllerBase, Result, RoutingError, TypeCapability};
use spark_endpoint_routing::{ConventionBuilder, Resolver, RouteEntry, RouteEntryOptions};
use tracing::debug;

use crate::builder::{EndpointRouteBuilder, find_or_create_data_source};

/// 宿主构建器上的映射扩展。
pub trait EndpointRouteBuilderExt {
    /// 以任意类型能力登记一个控制器集。
    ///
    /// 每次调用都创建独立的构建器与解析器；能力重叠时先登记者胜出。
    fn map_controllers_for(&mut self, capability: TypeCapability) -> Result<ConventionBuilder>;

    /// 以显式选项登记命名约定路由，返回条目本身作为约定句柄。
    fn map_route_with(
        &mut self,
        name: &str,
        template: &str,
        options: RouteEntryOptions,
    ) -> Result<Arc<RouteEntry>>;

    /// 所有控制器。
    fn map_controllers(&mut self) -> Result<ConventionBuilder> {
        self.map_controllers_of::<ControllerBase>()
    }

    /// `T` 及其派生控制器。
    fn map_controllers_of<T: Controller>(&mut self) -> Result<ConventionBuilder> {
        self.map_controllers_for(TypeCapability::of::<T>())
    }

    /// 恰为 `T` 的控制器，不含派生类型。
    fn map_controller<T: Controller>(&mut self) -> Result<ConventionBuilder> {
        self.map_controllers_for(TypeCapability::exactly::<T>())
    }

    /// 声明于程序集 `assembly` 的全部控制器。
    fn map_assembly(&mut self, assembly: &str) -> Result<ConventionBuilder> {
        if assembly.trim().is_empty() {
            return Err(RoutingError::invalid_argument(
                "assembly",
                "assembly name must not be empty",
            ));
        }
        self.map_controllers_for(TypeCapability::Assembly(Cow::Owned(assembly.to_owned())))
    }

    /// 以默认选项登记命名约定路由：无默认值、无约束、无数据令牌、基础控制器能力。
    fn map_route(&mut self, name: &str, template: &str) -> Result<Arc<RouteEntry>> {
        self.map_route_with(name, template, RouteEntryOptions::default())
    }
}

impl EndpointRouteBuilderExt for EndpointRouteBuilder {
    fn map_controllers_for(&mut self, capability: TypeCapability) -> Result<ConventionBuilder> {
        let data_source = find_or_create_data_source(self);
        let conventions = ConventionBuilder::new();
        let label = capability.to_string();
        data_source.add_resolver(Resolver::for_capability(capability, conventions.clone()))?;
        debug!(capability = %label, "controller set mapped");
        Ok(conventions)
    }

    fn map_route_with(
        &mut self,
        name: &str,
        template: &str,
        options: RouteEntryOptions,
    ) -> Result<Arc<RouteEntry>> {
        if name.trim().is_empty() {
            return Err(RoutingError::invalid_argument(
                "name",
                "route name must not be empty",
            ));
        }

        let data_source = find_or_create_data_source(self);
        let entry = Arc::new(RouteEntry::new(name, template, options));
        data_source.add_route_entry(Arc::clone(&entry))?;
        Ok(entry)
    }
}
