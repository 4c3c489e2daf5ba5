//! 路由模板与约束求值的接缝。
//!
//! # 教案级说明
//! - **定位 (Why)**：模板解析与约束求值属于外部协作者，端点数据源只把它当作
//!   “模板 + 约束 + 默认值 → 可匹配模式”的不透明变换来使用；
//! - **默认实现 (How)**：[`DefaultTemplateEngine`] 支持 `/` 分段、字面量段与单参数段，参数语法为
//!   `{*name}`（捕获剩余段）、`{name?}`（可选）、`{name:policy}`（内联约束，可重复）、`{name=default}`；
//!   约束通过注入的 [`ParameterPolicyFactory`] 解析；
//! - **契约 (What)**：不引入新的模板语法，不支持在同一段中混合字面量与参数。

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, RoutingError};
use crate::values::{RouteValue, RouteValues};

/// 单个参数上的约束策略。
pub trait ParameterPolicy: fmt::Debug + Send + Sync {
    /// 判断参数取值是否满足约束。
    fn accepts(&self, value: &str) -> bool;
}

/// 约束策略工厂，由宿主显式注入模板引擎。
///
/// - `create`：解析 `constraints` 映射中的约束值；
/// - `create_inline`：解析模板内联约束名（`{id:int}` 中的 `int`）；
/// - 无法识别的约束返回 [`RoutingError::UnknownParameterPolicy`]。
pub trait ParameterPolicyFactory: Send + Sync + 'static {
    fn create(&self, parameter: &str, reference: &RouteValue) -> Result<Arc<dyn ParameterPolicy>>;

    fn create_inline(&self, parameter: &str, policy: &str) -> Result<Arc<dyn ParameterPolicy>>;
}

#[derive(Debug)]
struct IntPolicy;

impl ParameterPolicy for IntPolicy {
    fn accepts(&self, value: &str) -> bool {
        value.parse::<i64>().is_ok()
    }
}

#[derive(Debug)]
struct BoolPolicy;

impl ParameterPolicy for BoolPolicy {
    fn accepts(&self, value: &str) -> bool {
        value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
    }
}

#[derive(Debug)]
struct AlphaPolicy;

impl ParameterPolicy for AlphaPolicy {
    fn accepts(&self, value: &str) -> bool {
        !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic())
    }
}

#[derive(Debug)]
struct RequiredPolicy;

impl ParameterPolicy for RequiredPolicy {
    fn accepts(&self, value: &str) -> bool {
        !value.is_empty()
    }
}

/// 大小写不敏感的 `a|b|c` 候选值约束。
#[derive(Debug)]
struct AlternativesPolicy {
    alternatives: Vec<String>,
}

impl ParameterPolicy for AlternativesPolicy {
    fn accepts(&self, value: &str) -> bool {
        self.alternatives
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(value))
    }
}

/// 默认约束策略工厂。
///
/// 内联策略名支持 `int`、`bool`、`alpha`、`required`；`constraints` 映射中的字面量
/// 按 `a|b|c` 候选值解释。
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultParameterPolicyFactory;

impl ParameterPolicyFactory for DefaultParameterPolicyFactory {
    fn create(&self, parameter: &str, reference: &RouteValue) -> Result<Arc<dyn ParameterPolicy>> {
        let Some(text) = reference.as_text() else {
            return Err(RoutingError::UnknownParameterPolicy {
                parameter: parameter.to_owned(),
                policy: reference.to_string(),
            });
        };
        let alternatives = text.split('|').map(str::to_owned).collect();
        Ok(Arc::new(AlternativesPolicy { alternatives }))
    }

    fn create_inline(&self, parameter: &str, policy: &str) -> Result<Arc<dyn ParameterPolicy>> {
        let policy: Arc<dyn ParameterPolicy> = match policy {
            "int" => Arc::new(IntPolicy),
            "bool" => Arc::new(BoolPolicy),
            "alpha" => Arc::new(AlphaPolicy),
            "required" => Arc::new(RequiredPolicy),
            other => {
                return Err(RoutingError::UnknownParameterPolicy {
                    parameter: parameter.to_owned(),
                    policy: other.to_owned(),
                });
            }
        };
        Ok(policy)
    }
}

/// 模板中的参数段。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateParameter {
    pub name: String,
    pub optional: bool,
    pub catch_all: bool,
    pub default: Option<String>,
    pub policies: Vec<String>,
    raw: String,
}

impl TemplateParameter {
    /// 参数在模板中的原始写法（含花括号）。
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// 模板段。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateSegment {
    Literal(String),
    Parameter(TemplateParameter),
}

/// 已解析的路由模板。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTemplate {
    text: String,
    segments: Vec<TemplateSegment>,
}

impl RouteTemplate {
    /// 解析模板文本。
    ///
    /// # 契约（What）
    /// - 开头的 `/` 或 `~/` 会被忽略，空模板表示根路径；
    /// - 以下情形返回 [`RoutingError::InvalidTemplate`]：空段、花括号不配对、同一段混合字面量与参数、
    ///   空参数名、重复参数名（大小写不敏感）、捕获参数不在最后一段、可选参数带默认值、
    ///   捕获参数标记为可选、空内联约束名。
    pub fn parse(template: &str) -> Result<Self> {
        let trimmed = template
            .strip_prefix("~/")
            .or_else(|| template.strip_prefix('/'))
            .unwrap_or(template);

        let mut segments = Vec::new();
        if !trimmed.is_empty() {
            for raw in trimmed.split('/') {
                segments.push(parse_segment(template, raw)?);
            }
        }

        let mut seen = BTreeSet::new();
        let last = segments.len().saturating_sub(1);
        for (index, segment) in segments.iter().enumerate() {
            if let TemplateSegment::Parameter(parameter) = segment {
                if !seen.insert(parameter.name.to_ascii_lowercase()) {
                    return Err(RoutingError::invalid_template(
                        template,
                        format!("parameter `{}` appears more than once", parameter.name),
                    ));
                }
                if parameter.catch_all && index != last {
                    return Err(RoutingError::invalid_template(
                        template,
                        "a catch-all parameter must be the last segment",
                    ));
                }
            }
        }

        Ok(Self {
            text: template.to_owned(),
            segments,
        })
    }

    /// 原始模板文本。
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> std::slice::Iter<'_, TemplateSegment> {
        self.segments.iter()
    }

    /// 按名称查找参数（大小写不敏感）。
    pub fn parameter(&self, name: &str) -> Option<&TemplateParameter> {
        self.segments.iter().find_map(|segment| match segment {
            TemplateSegment::Parameter(parameter) if parameter.name.eq_ignore_ascii_case(name) => {
                Some(parameter)
            }
            _ => None,
        })
    }

    pub fn parameters(&self) -> impl Iterator<Item = &TemplateParameter> {
        self.segments.iter().filter_map(|segment| match segment {
            TemplateSegment::Parameter(parameter) => Some(parameter),
            TemplateSegment::Literal(_) => None,
        })
    }
}

fn parse_segment(template: &str, raw: &str) -> Result<TemplateSegment> {
    if raw.is_empty() {
        return Err(RoutingError::invalid_template(
            template,
            "empty segment between separators",
        ));
    }

    let opens = raw.matches('{').count();
    let closes = raw.matches('}').count();
    if opens == 0 && closes == 0 {
        return Ok(TemplateSegment::Literal(raw.to_owned()));
    }
    if opens != closes {
        return Err(RoutingError::invalid_template(template, "unbalanced braces"));
    }
    if opens > 1 || !raw.starts_with('{') || !raw.ends_with('}') {
        return Err(RoutingError::invalid_template(
            template,
            format!("segment `{raw}` must be a literal or a single parameter"),
        ));
    }

    let inner = &raw[1..raw.len() - 1];
    let (catch_all, inner) = match inner.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };
    let (head, default) = match inner.split_once('=') {
        Some((head, default)) => (head, Some(default.to_owned())),
        None => (inner, None),
    };
    let (optional, head) = match head.strip_suffix('?') {
        Some(rest) => (true, rest),
        None => (false, head),
    };

    let mut parts = head.split(':');
    let name = parts.next().unwrap_or_default();
    if name.is_empty() || name.contains(['*', '?', '{', '}']) {
        return Err(RoutingError::invalid_template(
            template,
            format!("segment `{raw}` has an invalid parameter name"),
        ));
    }

    let mut policies = Vec::new();
    for policy in parts {
        if policy.is_empty() {
            return Err(RoutingError::invalid_template(
                template,
                format!("parameter `{name}` has an empty inline constraint"),
            ));
        }
        policies.push(policy.to_owned());
    }

    if optional && default.is_some() {
        return Err(RoutingError::invalid_template(
            template,
            format!("optional parameter `{name}` cannot have a default value"),
        ));
    }
    if optional && catch_all {
        return Err(RoutingError::invalid_template(
            template,
            format!("catch-all parameter `{name}` cannot be marked optional"),
        ));
    }

    Ok(TemplateSegment::Parameter(TemplateParameter {
        name: name.to_owned(),
        optional,
        catch_all,
        default,
        policies,
        raw: raw.to_owned(),
    }))
}

/// 编译后的可匹配路由。
#[derive(Clone, Debug)]
pub struct CompiledRoute {
    template: RouteTemplate,
    defaults: RouteValues,
    policies: Vec<(String, Arc<dyn ParameterPolicy>)>,
}

impl CompiledRoute {
    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    /// 合并内联默认值后的默认值映射。
    pub fn defaults(&self) -> &RouteValues {
        &self.defaults
    }

    fn policies_for<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Arc<dyn ParameterPolicy>> + 'a {
        self.policies
            .iter()
            .filter(move |(parameter, _)| parameter.eq_ignore_ascii_case(name))
            .map(|(_, policy)| policy)
    }

    /// 判断动作的必需路由值能否经由本路由到达。
    ///
    /// # 规则（How）
    /// 1. 模板中存在同名参数：非空值须通过该参数的全部约束；空值要求参数可选或带默认值；
    /// 2. 模板中不存在同名参数：须与同名默认值相等，无默认值时要求取值为空；
    /// 3. 不是参数的默认值被视为额外的必需值，动作缺失该值时仅在默认值为空时匹配。
    pub fn accepts_required_values(&self, required: &RouteValues) -> bool {
        for (key, value) in required {
            let key = key.as_str();
            if let Some(parameter) = self.template.parameter(key) {
                if value.is_empty() {
                    if !(parameter.optional || self.defaults.contains_key(key)) {
                        return false;
                    }
                    continue;
                }
                let Some(text) = value.as_text() else {
                    return false;
                };
                if !self.policies_for(key).all(|policy| policy.accepts(&text)) {
                    return false;
                }
            } else {
                let matched = match self.defaults.get(key) {
                    Some(default) => RouteValue::values_equal(default, value),
                    None => value.is_empty(),
                };
                if !matched {
                    return false;
                }
            }
        }

        self.defaults.iter().all(|(key, default)| {
            self.template.parameter(key.as_str()).is_some()
                || required.contains_key(key.as_str())
                || default.is_empty()
        })
    }

    /// 以必需路由值展开模板，返回端点模式文本，最长者在前。
    ///
    /// 第一个元素为完整展开；其后依次为省略尾部默认值段后的较短形式，
    /// 仅当被省略的每一段都可缺省（可选参数、捕获参数、带默认值的参数，或取值等于默认值的已替换段）时才产生。
    pub fn expand(&self, required: &RouteValues) -> Vec<String> {
        struct Rendered {
            text: String,
            substituted: bool,
            omittable: bool,
        }

        let rendered: Vec<Rendered> = self
            .template
            .segments()
            .map(|segment| match segment {
                TemplateSegment::Literal(text) => Rendered {
                    text: text.clone(),
                    substituted: false,
                    omittable: false,
                },
                TemplateSegment::Parameter(parameter) => {
                    let value = required
                        .get(&parameter.name)
                        .filter(|value| !value.is_empty())
                        .and_then(|value| value.as_text().map(|text| text.into_owned()));
                    match value {
                        Some(text) => {
                            let omittable = self.defaults.get(&parameter.name).is_some_and(
                                |default| {
                                    RouteValue::values_equal(default, &RouteValue::from(text.clone()))
                                },
                            );
                            Rendered {
                                text,
                                substituted: true,
                                omittable,
                            }
                        }
                        None => Rendered {
                            text: parameter.raw().to_owned(),
                            substituted: false,
                            omittable: parameter.optional
                                || parameter.catch_all
                                || self.defaults.contains_key(&parameter.name),
                        },
                    }
                }
            })
            .collect();

        let join = |end: usize| {
            rendered[..end]
                .iter()
                .map(|segment| segment.text.as_str())
                .collect::<Vec<_>>()
                .join("/")
        };

        let mut patterns = vec![join(rendered.len())];
        for end in (0..rendered.len()).rev() {
            let segment = &rendered[end];
            if !segment.omittable {
                break;
            }
            if segment.substituted {
                patterns.push(join(end));
            }
        }
        patterns
    }
}

/// 模板引擎：模板 + 默认值 + 约束 → 可匹配路由。
pub trait TemplateEngine: Send + Sync + 'static {
    fn compile(
        &self,
        template: &str,
        defaults: &RouteValues,
        constraints: &RouteValues,
    ) -> Result<CompiledRoute>;
}

/// 默认模板引擎，约束解析委托给注入的 [`ParameterPolicyFactory`]。
#[derive(Clone)]
pub struct DefaultTemplateEngine {
    policies: Arc<dyn ParameterPolicyFactory>,
}

impl DefaultTemplateEngine {
    pub fn new(policies: Arc<dyn ParameterPolicyFactory>) -> Self {
        Self { policies }
    }
}

impl Default for DefaultTemplateEngine {
    fn default() -> Self {
        Self::new(Arc::new(DefaultParameterPolicyFactory))
    }
}

impl fmt::Debug for DefaultTemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultTemplateEngine").finish_non_exhaustive()
    }
}

impl TemplateEngine for DefaultTemplateEngine {
    fn compile(
        &self,
        template: &str,
        defaults: &RouteValues,
        constraints: &RouteValues,
    ) -> Result<CompiledRoute> {
        let parsed = RouteTemplate::parse(template)?;

        let mut merged = defaults.clone();
        let mut policies = Vec::new();
        for parameter in parsed.parameters() {
            if let Some(default) = &parameter.default {
                if defaults.contains_key(&parameter.name) {
                    return Err(RoutingError::invalid_template(
                        template,
                        format!(
                            "parameter `{}` has both an inline and an explicit default value",
                            parameter.name
                        ),
                    ));
                }
                merged.insert(parameter.name.clone(), default.clone());
            }
            for policy in &parameter.policies {
                let policy = self.policies.create_inline(&parameter.name, policy)?;
                policies.push((parameter.name.clone(), policy));
            }
        }
        for (key, reference) in constraints {
            let policy = self.policies.create(key.as_str(), reference)?;
            policies.push((key.as_str().to_owned(), policy));
        }

        Ok(CompiledRoute {
            template: parsed,
            defaults: merged,
            policies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(controller: &'static str, action: &'static str) -> RouteValues {
        [("controller", controller), ("action", action)]
            .into_iter()
            .collect()
    }

    fn compile(template: &str, defaults: RouteValues, constraints: RouteValues) -> CompiledRoute {
        DefaultTemplateEngine::default()
            .compile(template, &defaults, &constraints)
            .expect("template should compile")
    }

    #[test]
    fn parses_parameter_markers() {
        let template = RouteTemplate::parse("/api/{controller}/{id:int:required?}/{*rest}")
            .expect("valid template");
        let id = template.parameter("ID").expect("id parameter");
        assert!(id.optional);
        assert_eq!(id.policies, ["int", "required"]);
        assert!(template.parameter("rest").expect("rest").catch_all);
        assert_eq!(template.parameters().count(), 3);
    }

    #[test]
    fn rejects_malformed_templates() {
        for bad in [
            "a//b",
            "{controller",
            "x{id}",
            "{}",
            "{a}/{A}",
            "{*rest}/tail",
            "{id?=3}",
            "{*rest?}",
            "{id:}",
        ] {
            assert!(
                matches!(
                    RouteTemplate::parse(bad),
                    Err(RoutingError::InvalidTemplate { .. })
                ),
                "`{bad}` should be rejected"
            );
        }
        assert!(RouteTemplate::parse("").is_ok());
    }

    #[test]
    fn inline_and_explicit_default_conflict() {
        let defaults: RouteValues = [("action", "Index")].into_iter().collect();
        let result = DefaultTemplateEngine::default().compile(
            "{controller}/{action=Index}",
            &defaults,
            &RouteValues::new(),
        );
        assert!(matches!(result, Err(RoutingError::InvalidTemplate { .. })));
    }

    #[test]
    fn unknown_inline_policy_is_reported() {
        let result = DefaultTemplateEngine::default().compile(
            "{id:guid}",
            &RouteValues::new(),
            &RouteValues::new(),
        );
        assert_eq!(
            result.err(),
            Some(RoutingError::UnknownParameterPolicy {
                parameter: "id".to_owned(),
                policy: "guid".to_owned(),
            })
        );
    }

    #[test]
    fn required_values_match_parameters_and_defaults() {
        let route = compile(
            "{controller}/{action}/{id?}",
            RouteValues::new(),
            RouteValues::new(),
        );
        assert!(route.accepts_required_values(&required("Home", "Index")));

        let defaults: RouteValues = [("controller", "Blog"), ("action", "Article")]
            .into_iter()
            .collect();
        let blog = compile("blog/{*article}", defaults, RouteValues::new());
        assert!(blog.accepts_required_values(&required("blog", "article")));
        assert!(!blog.accepts_required_values(&required("Home", "Index")));
    }

    #[test]
    fn constraints_filter_required_values() {
        let constraints: RouteValues = [("controller", "Home|Admin")].into_iter().collect();
        let route = compile("{controller}/{action}", RouteValues::new(), constraints);
        assert!(route.accepts_required_values(&required("admin", "Index")));
        assert!(!route.accepts_required_values(&required("Orders", "Index")));
    }

    #[test]
    fn unmatched_extra_default_rejects_action() {
        let defaults: RouteValues = [("area", "Admin")].into_iter().collect();
        let route = compile("{controller}/{action}", defaults, RouteValues::new());
        assert!(!route.accepts_required_values(&required("Home", "Index")));

        let mut with_area = required("Home", "Index");
        with_area.insert("area", "admin");
        assert!(route.accepts_required_values(&with_area));
    }

    #[test]
    fn expand_collapses_trailing_defaults() {
        let route = compile(
            "{controller=Home}/{action=Index}/{id?}",
            RouteValues::new(),
            RouteValues::new(),
        );
        assert_eq!(
            route.expand(&required("Home", "Index")),
            ["Home/Index/{id?}", "Home", ""]
        );
        assert_eq!(
            route.expand(&required("Home", "About")),
            ["Home/About/{id?}"]
        );
        assert_eq!(
            route.expand(&required("Admin", "Index")),
            ["Admin/Index/{id?}", "Admin"]
        );
    }

    proptest::proptest! {
        #[test]
        fn expansion_starts_full_and_only_shortens(
            controller in "[A-Za-z]{1,8}",
            action in "[A-Za-z]{1,8}",
        ) {
            let route = compile(
                "{controller=Home}/{action=Index}/{id?}",
                RouteValues::new(),
                RouteValues::new(),
            );
            let mut values = RouteValues::new();
            values.insert("controller", controller.clone());
            values.insert("action", action.clone());

            let patterns = route.expand(&values);
            proptest::prop_assert_eq!(&patterns[0], &format!("{controller}/{action}/{{id?}}"));
            for pair in patterns.windows(2) {
                proptest::prop_assert!(pair[1].len() < pair[0].len());
                proptest::prop_assert!(pair[0].starts_with(pair[1].as_str()));
            }
            let collapsible = action.eq_ignore_ascii_case("Index");
            proptest::prop_assert_eq!(patterns.len() > 1, collapsible);
        }
    }
}
