//! 声明式配置的端到端测试：解析、校验、按文档顺序登记。

use std::sync::Arc;

use spark_endpoint_core::{
    ActionTarget, AttributeRoute, Controller, ControllerType, Endpoint, MetadataValue, RouteValue,
    StaticActionCatalog, TypeCapability,
};
use spark_endpoint_hosting::{
    ConfigError, EndpointRouteBuilder, RoutingConfig, RoutingServices, find_or_create_data_source,
};
use spark_endpoint_routing::EndpointConventionBuilder;

struct HomeController;

impl Controller for HomeController {
    fn controller_type() -> ControllerType {
        ControllerType::new("HomeController", "web")
    }
}

struct AdminController;

impl Controller for AdminController {
    fn controller_type() -> ControllerType {
        ControllerType::new("AdminController", "web")
    }
}

const CONFIG: &str = r#"
[logging]
filter = "spark_endpoint_routing=debug"

[[routes]]
name = "default"
template = "{controller}/{action}/{id?}"
defaults = { controller = "Home", action = "Index" }
constraints = { controller = "Home|Admin" }

[[routes]]
name = "admin"
template = "manage/{controller}/{action}"
controller = "web::AdminController"
data_tokens = { area = "admin" }

[[controllers]]
capability = "web::AdminController"
"#;

fn builder() -> EndpointRouteBuilder {
    let catalog = StaticActionCatalog::new()
        .with(ActionTarget::of::<HomeController, _>("Index"))
        .with(ActionTarget::of::<AdminController, _>("Settings"))
        .with(
            ActionTarget::of::<AdminController, _>("Health")
                .with_attribute_route(AttributeRoute::new("admin/health")),
        );
    let services = RoutingServices::builder()
        .with_action_catalog(Arc::new(catalog))
        .build()
        .expect("catalog provided");
    EndpointRouteBuilder::new(services)
}

#[test]
fn applies_controllers_before_routes() {
    let config = RoutingConfig::from_toml_str(CONFIG).unwrap();
    assert_eq!(
        config.logging.filter.as_deref(),
        Some("spark_endpoint_routing=debug")
    );

    let mut builder = builder();
    let applied = config.apply(&mut builder).unwrap();
    assert_eq!(applied.controllers.len(), 1);
    let names: Vec<&str> = applied.routes.iter().map(|route| route.name()).collect();
    assert_eq!(names, ["default", "admin"]);
    assert_eq!(
        applied.routes[0].defaults().get("controller"),
        Some(&RouteValue::text("Home"))
    );
    assert_eq!(
        applied.routes[1].controller_filter(),
        &TypeCapability::of::<AdminController>()
    );

    applied.controllers[0]
        .with_metadata("policy", "admin-only")
        .unwrap();

    let endpoints = builder.endpoints().unwrap();
    let patterns: Vec<&str> = endpoints.iter().map(Endpoint::pattern).collect();
    assert_eq!(
        patterns,
        [
            "admin/health",
            "Home/Index/{id?}",
            "Home",
            "",
            "Admin/Settings/{id?}",
            "manage/Admin/Settings",
        ]
    );
    let health = endpoints.iter().next().unwrap();
    assert_eq!(
        health.metadata().get("policy").and_then(MetadataValue::as_text),
        Some("admin-only")
    );
    let admin = endpoints.named("admin").next().unwrap();
    assert_eq!(
        admin.data_tokens().get("area"),
        Some(&RouteValue::text("admin"))
    );
}

#[test]
fn invalid_sections_leave_the_builder_untouched() {
    let config = RoutingConfig::from_toml_str(
        r#"
        [[controllers]]
        assembly = "web"

        [[routes]]
        name = "broken"
        template = "{controller}"
        controller = "web::AdminController"
        assembly = "web"
        "#,
    )
    .unwrap();

    let mut builder = builder();
    assert!(matches!(
        config.apply(&mut builder),
        Err(ConfigError::Invalid { .. })
    ));
    assert!(builder.data_sources().is_empty());
}

#[test]
fn registration_errors_are_wrapped() {
    let config = RoutingConfig::from_toml_str(
        r#"
        [[routes]]
        name = "late"
        template = "{controller}/{action}"
        "#,
    )
    .unwrap();

    let mut builder = builder();
    find_or_create_data_source(&mut builder);
    builder.endpoints().unwrap();

    assert!(matches!(
        config.apply(&mut builder),
        Err(ConfigError::Routing(_))
    ));
}

#[test]
fn missing_files_report_the_path() {
    let error = RoutingConfig::load("/nonexistent/spark-routing.toml").unwrap_err();
    match error {
        ConfigError::Io { path, .. } => {
            assert!(path.ends_with("spark-routing.toml"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
