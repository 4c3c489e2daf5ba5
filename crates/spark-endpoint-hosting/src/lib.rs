#![deny(unsafe_code)]
#![doc = "spark-endpoint-hosting: 在应用启动阶段登记控制器集与约定路由，并把它们汇总为端点表。"]

pub mod builder;
pub mod config;
pub mod mapping;
pub mod telemetry;

pub use builder::{
    DataSourceRegistry, EndpointRouteBuilder, RoutingServices, RoutingServicesBuilder,
    find_or_create_data_source,
};
pub use config::{AppliedConfig, ConfigError, RoutingConfig};
pub use mapping::EndpointRouteBuilderExt;
pub use telemetry::{TelemetryError, init_tracing};
