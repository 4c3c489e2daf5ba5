//! 端点注册性质测试
//!
//! - 路由表严格保持注册顺序；
//! - 解析器链对任意能力序列都遵循先登记者胜出；
//! - 同一装配状态重复物化得到结构相等的端点集；
//! - `map_route` 与以默认选项调用的 `map_route_with` 等价。

use std::sync::Arc;

use proptest::prelude::*;
use spark_endpoint_core::{
    ActionTarget, AttributeRoute, Controller, ControllerType, RouteValues, StaticActionCatalog,
    TypeCapability,
};
use spark_endpoint_hosting::{
    EndpointRouteBuilder, EndpointRouteBuilderExt, RoutingServices, find_or_create_data_source,
};
use spark_endpoint_routing::{EndpointConventionBuilder, RouteEntryOptions};

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

struct AuditController;

impl Controller for AuditController {
    fn controller_type() -> ControllerType {
        ControllerType::derived_from::<AdminController, _, _>("AuditController", "ops")
    }
}

fn actions() -> Vec<ActionTarget> {
    vec![
        ActionTarget::of::<HomeController, _>("Index"),
        ActionTarget::of::<HomeController, _>("Privacy"),
        ActionTarget::of::<AdminController, _>("Users")
            .with_attribute_route(AttributeRoute::new("admin/users/{id?}")),
        ActionTarget::of::<AuditController, _>("Trail")
            .with_attribute_route(AttributeRoute::new("audit/trail").with_name("trail")),
        ActionTarget::of::<AuditController, _>("Export"),
    ]
}

fn builder() -> EndpointRouteBuilder {
    let catalog: StaticActionCatalog = actions().into_iter().collect();
    let services = RoutingServices::builder()
        .with_action_catalog(Arc::new(catalog))
        .build()
        .expect("catalog provided");
    EndpointRouteBuilder::new(services)
}

fn capability() -> impl Strategy<Value = TypeCapability> {
    prop_oneof![
        Just(TypeCapability::base()),
        Just(TypeCapability::of::<AdminController>()),
        Just(TypeCapability::exactly::<AdminController>()),
        Just(TypeCapability::of::<AuditController>()),
        Just(TypeCapability::Assembly("web".into())),
        Just(TypeCapability::Assembly("ops".into())),
    ]
}

#[derive(Clone, Debug)]
enum Mapping {
    Controllers(TypeCapability),
    Route { name: String, with_defaults: bool },
}

fn mappings() -> impl Strategy<Value = Vec<Mapping>> {
    prop::collection::vec(
        prop_oneof![
            capability().prop_map(Mapping::Controllers),
            any::<bool>().prop_map(|with_defaults| Mapping::Route {
                name: String::new(),
                with_defaults,
            }),
        ],
        0..8,
    )
    .prop_map(|mut mappings| {
        for (index, mapping) in mappings.iter_mut().enumerate() {
            if let Mapping::Route { name, .. } = mapping {
                *name = format!("route{index}");
            }
        }
        mappings
    })
}

fn register(builder: &mut EndpointRouteBuilder, mappings: &[Mapping]) {
    for mapping in mappings {
        match mapping {
            Mapping::Controllers(capability) => {
                let conventions = builder.map_controllers_for(capability.clone()).unwrap();
                conventions.with_metadata("owner", capability.to_string()).unwrap();
            }
            Mapping::Route {
                name,
                with_defaults,
            } => {
                let mut options = RouteEntryOptions::new();
                if *with_defaults {
                    let defaults: RouteValues = [("controller", "Home"), ("action", "Index")]
                        .into_iter()
                        .collect();
                    options = options.with_defaults(defaults);
                }
                let entry = builder
                    .map_route_with(name, "{controller}/{action}/{id?}", options)
                    .unwrap();
                entry.with_display_name(name.clone()).unwrap();
            }
        }
    }
}

proptest! {
    #[test]
    fn route_table_preserves_registration_order(
        names in prop::collection::hash_set("[a-z]{1,10}", 0..12)
            .prop_map(|names| names.into_iter().collect::<Vec<_>>())
    ) {
        let mut builder = builder();
        for name in &names {
            builder.map_route(name, "{controller}/{action}").unwrap();
        }
        let source = find_or_create_data_source(&mut builder);
        let registered: Vec<String> = source
            .route_entries()
            .iter()
            .map(|entry| entry.name().to_owned())
            .collect();
        prop_assert_eq!(registered, names);
    }

    #[test]
    fn first_registered_resolver_claims_the_action(
        capabilities in prop::collection::vec(capability(), 0..8)
    ) {
        let mut builder = builder();
        let handles: Vec<_> = capabilities
            .iter()
            .map(|capability| builder.map_controllers_for(capability.clone()).unwrap())
            .collect();
        let source = find_or_create_data_source(&mut builder);

        for action in actions() {
            let expected = capabilities
                .iter()
                .position(|capability| capability.accepts(action.controller()));
            match (source.resolve(&action), expected) {
                (Some(owner), Some(index)) => prop_assert!(owner.same_as(&handles[index])),
                (None, None) => {}
                (actual, expected) => prop_assert!(
                    false,
                    "action {} resolved to {:?}, expected resolver {:?}",
                    action.id(),
                    actual,
                    expected
                ),
            }
        }
    }

    #[test]
    fn materialization_is_idempotent(plan in mappings()) {
        let mut first = builder();
        register(&mut first, &plan);
        let mut second = builder();
        register(&mut second, &plan);

        let once = first.endpoints().unwrap();
        let twice = first.endpoints().unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once, second.endpoints().unwrap());
    }

    #[test]
    fn short_route_form_delegates_to_the_full_form(
        name in "[A-Za-z][A-Za-z0-9_]{0,15}",
        template in "[a-z{}/?=]{0,24}",
    ) {
        let mut short = builder();
        let mut full = builder();
        let lhs = short.map_route(&name, &template).unwrap();
        let rhs = full
            .map_route_with(&name, &template, RouteEntryOptions::default())
            .unwrap();

        prop_assert_eq!(lhs.name(), rhs.name());
        prop_assert_eq!(lhs.template(), rhs.template());
        prop_assert_eq!(lhs.options(), rhs.options());
        prop_assert_eq!(lhs.controller_filter(), &TypeCapability::base());
    }
}
