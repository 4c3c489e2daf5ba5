use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::controller::{Controller, ControllerType};
use crate::values::RouteValues;

/// 必需路由值：控制器名。
pub const CONTROLLER_KEY: &str = "controller";
/// 必需路由值：动作名。
pub const ACTION_KEY: &str = "action";

/// 动作目标的稳定标识。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId(Cow<'static, str>);

impl ActionId {
    pub fn new<S>(id: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 动作上静态声明的路由（特性路由）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeRoute {
    pub template: Cow<'static, str>,
    pub name: Option<Cow<'static, str>>,
    pub order: i32,
}

impl AttributeRoute {
    pub fn new<S>(template: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        Self {
            template: template.into(),
            name: None,
            order: 0,
        }
    }

    pub fn with_name<S>(mut self, name: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        self.name = Some(name.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// 可分发的动作目标，由外部发现机制枚举，发现后不可变。
///
/// # 教案级说明
/// - **契约 (What)**：
///   - `route_values` 至少包含 `controller` 与 `action` 两个必需值，
///     控制器名取自 [`ControllerType::route_name`]；
///   - `attribute_route` 为 `Some` 时表示特性路由动作，否则只能经由约定路由到达。
/// - **构造 (How)**：[`ActionTarget::new`] 自动填充必需值，`with_route_value` 可追加
///   `area` 等额外必需值。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionTarget {
    id: ActionId,
    controller: ControllerType,
    action_name: Cow<'static, str>,
    route_values: RouteValues,
    attribute_route: Option<AttributeRoute>,
}

impl ActionTarget {
    /// 以控制器类型与动作名创建目标，标识为 `<程序集>::<控制器类型名>.<动作名>`。
    pub fn new<S>(controller: ControllerType, action_name: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        let action_name = action_name.into();
        let id = ActionId::new(format!("{}.{}", controller.key(), action_name));
        let mut route_values = RouteValues::new();
        route_values.insert(CONTROLLER_KEY, controller.route_name().to_owned());
        route_values.insert(ACTION_KEY, action_name.clone().into_owned());
        Self {
            id,
            controller,
            action_name,
            route_values,
            attribute_route: None,
        }
    }

    /// 以静态控制器类型创建目标。
    pub fn of<T: Controller, S>(action_name: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        Self::new(T::controller_type(), action_name)
    }

    /// 声明特性路由。
    pub fn with_attribute_route(mut self, route: AttributeRoute) -> Self {
        self.attribute_route = Some(route);
        self
    }

    /// 追加必需路由值。
    pub fn with_route_value<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<crate::values::RouteKey>,
        V: Into<crate::values::RouteValue>,
    {
        self.route_values.insert(key, value);
        self
    }

    pub fn id(&self) -> &ActionId {
        &self.id
    }

    pub fn controller(&self) -> &ControllerType {
        &self.controller
    }

    pub fn action_name(&self) -> &str {
        &self.action_name
    }

    pub fn route_values(&self) -> &RouteValues {
        &self.route_values
    }

    pub fn attribute_route(&self) -> Option<&AttributeRoute> {
        self.attribute_route.as_ref()
    }

    /// 是否为特性路由动作。
    pub fn is_attribute_routed(&self) -> bool {
        self.attribute_route.is_some()
    }
}

/// 动作目录：外部发现机制的接缝。
///
/// - 实现需满足 `Send + Sync`，以便数据源在多线程环境共享；
/// - 返回顺序即物化时的遍历顺序，实现应保持稳定。
pub trait ActionCatalog: Send + Sync + 'static {
    /// 枚举全部候选动作。
    fn actions(&self) -> Vec<ActionTarget>;
}

impl<T> ActionCatalog for Arc<T>
where
    T: ActionCatalog + ?Sized,
{
    fn actions(&self) -> Vec<ActionTarget> {
        (**self).actions()
    }
}

/// 基于向量的动作目录，适用于在代码中声明动作的宿主与测试。
#[derive(Clone, Debug, Default)]
pub struct StaticActionCatalog {
    actions: Vec<ActionTarget>,
}

impl StaticActionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加动作，返回自身以便链式声明。
    pub fn with(mut self, action: ActionTarget) -> Self {
        self.actions.push(action);
        self
    }

    pub fn push(&mut self, action: ActionTarget) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl FromIterator<ActionTarget> for StaticActionCatalog {
    fn from_iter<I: IntoIterator<Item = ActionTarget>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}

impl ActionCatalog for StaticActionCatalog {
    fn actions(&self) -> Vec<ActionTarget> {
        self.actions.clone()
    }
}
