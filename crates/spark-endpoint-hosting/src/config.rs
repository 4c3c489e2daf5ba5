//! 声明式路由配置。
//!
//! # 教案级说明
//! - **格式 (What)**：TOML 文档，包含 `[logging]`、若干 `[[controllers]]` 与 `[[routes]]`：
//!
//! ```toml
//! [logging]
//! filter = "spark_endpoint_routing=debug"
//!
//! [[controllers]]
//! capability = "web::AdminController"
//!
//! [[routes]]
//! name = "default"
//! template = "{controller}/{action}/{id?}"
//! defaults = { controller = "Home", action = "Index" }
//! constraints = { controller = "Home|Admin" }
//! ```
//!
//! - **类型引用**：`capability`、`exact`、`controller`、`controller_exact` 使用 `程序集::类型名`
//!   形式的限定名，同名类型以程序集区分；
//! - **应用顺序 (How)**：先按文档顺序登记全部 `[[controllers]]`，再按文档顺序登记全部 `[[routes]]`；
//! - **校验**：整份配置先完成校验与转换，全部通过后才开始登记，校验失败时构建器保持原状。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use spark_endpoint_core::{RouteValue, RouteValues, RoutingError, TypeCapability, TypeKey};
use spark_endpoint_routing::{ConventionBuilder, RouteEntry, RouteEntryOptions};
use thiserror::Error;
use tracing::info;

use crate::builder::EndpointRouteBuilder;
use crate::mapping::EndpointRouteBuilderExt;

/// 配置加载与应用阶段的错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read routing configuration `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse routing configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid `{section}` section: {reason}")]
    Invalid { section: String, reason: String },
    #[error(transparent)]
    Routing(#[from] RoutingError),
}

impl ConfigError {
    fn invalid(section: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            section: section.into(),
            reason: reason.into(),
        }
    }
}

/// 路由配置根。
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub controllers: Vec<ControllersConfig>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` 语法的过滤规则。
    pub filter: Option<String>,
}

/// 一个控制器集映射；`capability`、`exact`、`assembly` 三者恰好设置一个。
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ControllersConfig {
    /// 限定类型名：该类型及其派生类型。
    pub capability: Option<String>,
    /// 限定类型名：仅该类型。
    pub exact: Option<String>,
    /// 程序集名。
    pub assembly: Option<String>,
}

/// 一个命名约定路由。`controller`、`controller_exact`、`assembly` 至多设置一个，缺省为基础能力。
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub defaults: BTreeMap<String, ConfigValue>,
    #[serde(default)]
    pub constraints: BTreeMap<String, ConfigValue>,
    #[serde(default)]
    pub data_tokens: BTreeMap<String, ConfigValue>,
    pub controller: Option<String>,
    pub controller_exact: Option<String>,
    pub assembly: Option<String>,
}

/// 配置中的路由值：字面量，或 `{ optional = true }` 形式的可选参数标记。
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Text(String),
    Marker { optional: bool },
}

impl ConfigValue {
    fn to_route_value(&self, section: &str, key: &str) -> Result<RouteValue, ConfigError> {
        match self {
            ConfigValue::Bool(value) => Ok(RouteValue::Bool(*value)),
            ConfigValue::Integer(value) => Ok(RouteValue::Integer(*value)),
            ConfigValue::Text(value) => Ok(RouteValue::text(value.clone())),
            ConfigValue::Marker { optional: true } => Ok(RouteValue::Optional),
            ConfigValue::Marker { optional: false } => Err(ConfigError::invalid(
                section,
                format!("`{key}` uses a marker object without `optional = true`"),
            )),
        }
    }
}

/// 应用配置后得到的句柄，顺序与文档一致，可继续追加约定。
#[derive(Debug, Default)]
pub struct AppliedConfig {
    pub controllers: Vec<ConventionBuilder>,
    pub routes: Vec<Arc<RouteEntry>>,
}

impl RoutingConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// 把配置登记到构建器。
    pub fn apply(&self, builder: &mut EndpointRouteBuilder) -> Result<AppliedConfig, ConfigError> {
        let capabilities = self
            .controllers
            .iter()
            .enumerate()
            .map(|(index, controllers)| controllers.capability(index))
            .collect::<Result<Vec<_>, _>>()?;
        let routes = self
            .routes
            .iter()
            .map(RouteConfig::options)
            .collect::<Result<Vec<_>, _>>()?;

        let mut applied = AppliedConfig::default();
        for capability in capabilities {
            applied.controllers.push(builder.map_controllers_for(capability)?);
        }
        for (route, options) in self.routes.iter().zip(routes) {
            applied
                .routes
                .push(builder.map_route_with(&route.name, &route.template, options)?);
        }

        info!(
            controllers = applied.controllers.len(),
            routes = applied.routes.len(),
            "routing configuration applied"
        );
        Ok(applied)
    }
}

impl ControllersConfig {
    fn capability(&self, index: usize) -> Result<TypeCapability, ConfigError> {
        let section = format!("controllers[{index}]");
        match (&self.capability, &self.exact, &self.assembly) {
            (Some(name), None, None) => Ok(TypeCapability::Assignable(type_key(
                &section,
                "capability",
                name,
            )?)),
            (None, Some(name), None) => Ok(TypeCapability::Exact(type_key(&section, "exact", name)?)),
            (None, None, Some(name)) => Ok(TypeCapability::Assembly(
                non_empty(&section, "assembly", name)?.into(),
            )),
            _ => Err(ConfigError::invalid(
                section,
                "exactly one of `capability`, `exact` or `assembly` must be set",
            )),
        }
    }
}

impl RouteConfig {
    fn options(&self) -> Result<RouteEntryOptions, ConfigError> {
        let section = format!("routes.{}", self.name);
        non_empty(&section, "name", &self.name)?;
        let controller_filter = match (&self.controller, &self.controller_exact, &self.assembly) {
            (None, None, None) => TypeCapability::base(),
            (Some(name), None, None) => {
                TypeCapability::Assignable(type_key(&section, "controller", name)?)
            }
            (None, Some(name), None) => {
                TypeCapability::Exact(type_key(&section, "controller_exact", name)?)
            }
            (None, None, Some(name)) => {
                TypeCapability::Assembly(non_empty(&section, "assembly", name)?.into())
            }
            _ => {
                return Err(ConfigError::invalid(
                    section,
                    "at most one of `controller`, `controller_exact` or `assembly` may be set",
                ));
            }
        };

        Ok(RouteEntryOptions::new()
            .with_defaults(route_values(&section, &self.defaults)?)
            .with_constraints(route_values(&section, &self.constraints)?)
            .with_data_tokens(route_values(&section, &self.data_tokens)?)
            .with_controller_filter(controller_filter))
    }
}

fn route_values(
    section: &str,
    values: &BTreeMap<String, ConfigValue>,
) -> Result<RouteValues, ConfigError> {
    let mut converted = RouteValues::new();
    for (key, value) in values {
        converted.insert(key.clone(), value.to_route_value(section, key)?);
    }
    Ok(converted)
}

fn type_key(section: &str, field: &str, value: &str) -> Result<TypeKey, ConfigError> {
    TypeKey::parse(non_empty(section, field, value)?.as_str()).ok_or_else(|| {
        ConfigError::invalid(
            section,
            format!("`{field}` must be a qualified type name such as `web::HomeController`"),
        )
    })
}

fn non_empty(section: &str, field: &str, value: &str) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(section, format!("`{field}` must not be empty")));
    }
    Ok(value.to_owned())
}
