#![deny(unsafe_code)]
//! # spark-endpoint-routing
//!
//! 把“已注册的路由与约定”物化为端点快照：
//! - `conventions`：约定构建器，延迟到物化时才作用于端点；
//! - `resolver`：解析器链，按注册顺序为每个特性路由动作选出所属构建器（先到先得）；
//! - `route_table`：约定路由条目与有序路由表；
//! - `data_source`：控制器端点数据源，持有上述状态并负责物化与缓存。

pub mod conventions;
pub mod data_source;
pub mod resolver;
pub mod route_table;

pub use conventions::{ConventionBuilder, EndpointConventionBuilder};
pub use data_source::{ControllerEndpointDataSource, EndpointDataSource};
pub use resolver::{Resolver, ResolverChain};
pub use route_table::{ConventionalRouteTable, RouteEntry, RouteEntryOptions};
