use std::borrow::Cow;
use std::fmt;

/// 根控制器类型名，所有控制器的谱系均以它结尾。
pub const CONTROLLER_BASE: &str = "ControllerBase";

/// 根控制器类型所在的程序集。
pub const CONTROLLER_BASE_ASSEMBLY: &str = "spark";

const CONTROLLER_SUFFIX: &str = "Controller";
const TYPE_SEPARATOR: &str = "::";

fn base_key() -> TypeKey {
    TypeKey::new(CONTROLLER_BASE_ASSEMBLY, CONTROLLER_BASE)
}

/// 控制器类型的限定名：`(程序集, 类型名)`。
///
/// 同名类型可以出现在不同程序集中（例如站点与管理区各有一个 `HomeController`），
/// 因此类型身份、谱系与能力谓词一律以限定名比较，不单独比较类型名。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeKey {
    assembly: Cow<'static, str>,
    name: Cow<'static, str>,
}

impl TypeKey {
    pub fn new<A, N>(assembly: A, name: N) -> Self
    where
        A: Into<Cow<'static, str>>,
        N: Into<Cow<'static, str>>,
    {
        Self {
            assembly: assembly.into(),
            name: name.into(),
        }
    }

    /// 解析 `assembly::Name` 形式的限定名；任一部分为空时返回 `None`。
    pub fn parse(qualified: &str) -> Option<Self> {
        let (assembly, name) = qualified.trim().rsplit_once(TYPE_SEPARATOR)?;
        let (assembly, name) = (assembly.trim(), name.trim());
        if assembly.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(assembly.to_owned(), name.to_owned()))
    }

    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{TYPE_SEPARATOR}{}", self.assembly, self.name)
    }
}

/// 声明动作的控制器类型身份。
///
/// # 教案级说明
/// - **契约 (What)**：`lineage` 以类型自身开头、以 [`ControllerBase`] 结尾，依次列出各级基类的
///   [`TypeKey`]；`assembly` 标识类型所在的程序集（模块、crate 等发现单元）；
/// - **设计 (How)**：类型关系以显式谱系表达，赋值兼容性检查退化为谱系成员判断，
///   无需运行时反射。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ControllerType {
    key: TypeKey,
    lineage: Vec<TypeKey>,
}

impl ControllerType {
    /// 构造直接派生自 [`ControllerBase`] 的控制器类型。
    pub fn new<N, A>(name: N, assembly: A) -> Self
    where
        N: Into<Cow<'static, str>>,
        A: Into<Cow<'static, str>>,
    {
        let key = TypeKey::new(assembly, name);
        let base = base_key();
        let mut lineage = vec![key.clone()];
        if key != base {
            lineage.push(base);
        }
        Self { key, lineage }
    }

    /// 构造派生自 `B` 的控制器类型，谱系继承 `B` 的完整谱系。
    pub fn derived_from<B, N, A>(name: N, assembly: A) -> Self
    where
        B: Controller,
        N: Into<Cow<'static, str>>,
        A: Into<Cow<'static, str>>,
    {
        let key = TypeKey::new(assembly, name);
        let mut lineage = vec![key.clone()];
        lineage.extend(B::controller_type().lineage);
        Self { key, lineage }
    }

    /// 限定名。
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    /// 类型名。
    pub fn name(&self) -> &str {
        self.key.name()
    }

    /// 所属程序集。
    pub fn assembly(&self) -> &str {
        self.key.assembly()
    }

    /// 谱系（自身在前）。
    pub fn lineage(&self) -> impl Iterator<Item = &TypeKey> {
        self.lineage.iter()
    }

    /// 判断本类型能否赋值给 `base`（即等于或派生自它）。
    pub fn is_assignable_to(&self, base: &TypeKey) -> bool {
        self.lineage.contains(base)
    }

    /// 路由值中使用的控制器名：去掉 `Controller` 后缀。
    pub fn route_name(&self) -> &str {
        let name = self.name();
        match name.strip_suffix(CONTROLLER_SUFFIX) {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => name,
        }
    }
}

impl fmt::Display for ControllerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key, f)
    }
}

/// 静态绑定的控制器类型。
///
/// 注册接口以 `T: Controller` 作为类型参数时，编译期即保证了能力谓词与某个真实控制器类型对应。
pub trait Controller: 'static {
    /// 返回类型身份。
    fn controller_type() -> ControllerType;
}

/// 所有控制器的根类型。
#[derive(Clone, Copy, Debug, Default)]
pub struct ControllerBase;

impl Controller for ControllerBase {
    fn controller_type() -> ControllerType {
        ControllerType::new(CONTROLLER_BASE, CONTROLLER_BASE_ASSEMBLY)
    }
}

/// 可在运行时求值的类型能力谓词。
///
/// - `Assignable`：类型自身或其派生类型；
/// - `Exact`：仅限该类型；
/// - `Assembly`：声明于指定程序集的所有类型。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeCapability {
    Assignable(TypeKey),
    Exact(TypeKey),
    Assembly(Cow<'static, str>),
}

impl TypeCapability {
    /// `T` 或其派生类型。
    pub fn of<T: Controller>() -> Self {
        Self::Assignable(T::controller_type().key)
    }

    /// 恰为 `T`。
    pub fn exactly<T: Controller>() -> Self {
        Self::Exact(T::controller_type().key)
    }

    /// 基础能力：接受任意控制器。
    pub fn base() -> Self {
        Self::Assignable(base_key())
    }

    /// 判断控制器类型是否满足该能力。
    pub fn accepts(&self, controller: &ControllerType) -> bool {
        match self {
            TypeCapability::Assignable(base) => controller.is_assignable_to(base),
            TypeCapability::Exact(key) => controller.key() == key,
            TypeCapability::Assembly(assembly) => controller.assembly() == assembly.as_ref(),
        }
    }
}

impl Default for TypeCapability {
    fn default() -> Self {
        Self::base()
    }
}

impl fmt::Display for TypeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeCapability::Assignable(key) => write!(f, "assignable:{key}"),
            TypeCapability::Exact(key) => write!(f, "exact:{key}"),
            TypeCapability::Assembly(name) => write!(f, "assembly:{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AdminController;

    impl Controller for AdminController {
        fn controller_type() -> ControllerType {
            ControllerType::new("AdminController", "app")
        }
    }

    struct SuperAdminController;

    impl Controller for SuperAdminController {
        fn controller_type() -> ControllerType {
            ControllerType::derived_from::<AdminController, _, _>("SuperAdminController", "app")
        }
    }

    #[test]
    fn lineage_ends_with_controller_base() {
        let ty = SuperAdminController::controller_type();
        let lineage: Vec<&str> = ty.lineage().map(TypeKey::name).collect();
        assert_eq!(
            lineage,
            ["SuperAdminController", "AdminController", CONTROLLER_BASE]
        );
        assert_eq!(ty.route_name(), "SuperAdmin");
    }

    #[test]
    fn capabilities_follow_lineage() {
        let admin = AdminController::controller_type();
        let super_admin = SuperAdminController::controller_type();
        let other = ControllerType::new("HomeController", "web");

        let assignable = TypeCapability::of::<AdminController>();
        assert!(assignable.accepts(&admin));
        assert!(assignable.accepts(&super_admin));
        assert!(!assignable.accepts(&other));

        let exact = TypeCapability::exactly::<AdminController>();
        assert!(exact.accepts(&admin));
        assert!(!exact.accepts(&super_admin));

        assert!(TypeCapability::base().accepts(&other));
        assert!(TypeCapability::Assembly(Cow::Borrowed("web")).accepts(&other));
        assert!(!TypeCapability::Assembly(Cow::Borrowed("web")).accepts(&admin));
    }

    #[test]
    fn same_named_types_in_other_assemblies_are_distinct() {
        struct AreaAdminController;

        impl Controller for AreaAdminController {
            fn controller_type() -> ControllerType {
                ControllerType::new("AdminController", "admin_area")
            }
        }

        let site = AdminController::controller_type();
        let area = AreaAdminController::controller_type();
        assert_eq!(site.name(), area.name());
        assert_ne!(site, area);
        assert!(!area.is_assignable_to(site.key()));

        assert!(!TypeCapability::of::<AdminController>().accepts(&area));
        assert!(!TypeCapability::exactly::<AdminController>().accepts(&area));
        assert!(TypeCapability::of::<AreaAdminController>().accepts(&area));
        assert!(TypeCapability::base().accepts(&area));
    }

    #[test]
    fn qualified_names_parse_from_text() {
        let key = TypeKey::parse("web::HomeController").expect("qualified");
        assert_eq!(key.assembly(), "web");
        assert_eq!(key.name(), "HomeController");
        assert_eq!(key.to_string(), "web::HomeController");
        assert_eq!(
            TypeKey::parse("my::nested::HomeController").map(|key| key.assembly().to_owned()),
            Some("my::nested".to_owned())
        );
        assert!(TypeKey::parse("HomeController").is_none());
        assert!(TypeKey::parse("::HomeController").is_none());
        assert!(TypeKey::parse("web::").is_none());
    }

    #[test]
    fn controller_base_lineage_is_itself() {
        let base = ControllerBase::controller_type();
        assert_eq!(base.lineage().count(), 1);
        assert_eq!(base.route_name(), "ControllerBase");
    }
}
