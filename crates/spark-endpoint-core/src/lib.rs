#![deny(unsafe_code)]
//! # spark-endpoint-core
//!
//! ## 定位（Why）
//! - 沉淀“动作目标 → 可分发端点”解析过程中所有组件共享的契约类型，供
//!   `spark-endpoint-routing`（数据源与约定）与 `spark-endpoint-hosting`（注册入口）依赖；
//! - 模板解析与约束求值在此仅以 [`TemplateEngine`] / [`ParameterPolicyFactory`] 接缝出现，
//!   宿主可替换为自有实现。
//!
//! ## 模块结构（How）
//! - `values`：路由值与大小写不敏感的有序映射；
//! - `metadata`：端点元数据键值；
//! - `controller`：控制器类型身份与能力谓词；
//! - `action`：动作目标与动作目录；
//! - `template`：路由模板、参数策略与默认模板引擎；
//! - `endpoint`：端点、端点快照与约定闭包；
//! - `error`：统一错误域。

pub mod action;
pub mod controller;
pub mod endpoint;
pub mod error;
pub mod metadata;
pub mod template;
pub mod values;

pub use action::{ActionCatalog, ActionId, ActionTarget, AttributeRoute, StaticActionCatalog};
pub use controller::{Controller, ControllerBase, ControllerType, TypeCapability, TypeKey};
pub use endpoint::{Convention, Endpoint, EndpointBuilder, EndpointSnapshot, EndpointSource};
pub use error::{Result, RoutingError};
pub use metadata::{EndpointMetadata, MetadataKey, MetadataValue};
pub use template::{
    CompiledRoute, DefaultParameterPolicyFactory, DefaultTemplateEngine, ParameterPolicy,
    ParameterPolicyFactory, RouteTemplate, TemplateEngine, TemplateParameter, TemplateSegment,
};
pub use values::{RouteKey, RouteValue, RouteValues};
