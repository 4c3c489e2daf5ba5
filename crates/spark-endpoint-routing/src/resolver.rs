use std::fmt;
use std::sync::Arc;

use spark_endpoint_core::{ActionTarget, TypeCapability};

use crate::conventions::ConventionBuilder;

type ResolveFn = Box<dyn Fn(&ActionTarget) -> Option<ConventionBuilder> + Send + Sync>;

/// 解析器：`ActionTarget → ConventionBuilder?` 的纯函数。
///
/// 解析器与其构建器同时创建，闭包同时捕获构建器与类型成员谓词；
/// `owner` 另存一份句柄，供数据源物化时封存。
pub struct Resolver {
    label: String,
    owner: ConventionBuilder,
    resolve: ResolveFn,
}

impl Resolver {
    /// 以任意谓词创建解析器：谓词命中时返回 `owner`。
    pub fn new<P>(label: impl Into<String>, owner: ConventionBuilder, predicate: P) -> Self
    where
        P: Fn(&ActionTarget) -> bool + Send + Sync + 'static,
    {
        let captured = owner.clone();
        Self {
            label: label.into(),
            owner,
            resolve: Box::new(move |action| predicate(action).then(|| captured.clone())),
        }
    }

    /// 以类型能力创建解析器：动作的声明类型满足 `capability` 时归属 `owner`。
    pub fn for_capability(capability: TypeCapability, owner: ConventionBuilder) -> Self {
        let label = capability.to_string();
        Self::new(label, owner, move |action| {
            capability.accepts(action.controller())
        })
    }

    pub fn resolve(&self, action: &ActionTarget) -> Option<ConventionBuilder> {
        (self.resolve)(action)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn owner(&self) -> &ConventionBuilder {
        &self.owner
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("label", &self.label)
            .field("owner", &self.owner)
            .finish()
    }
}

/// 有序解析器链。
///
/// 按注册顺序求值，首个非空结果胜出；多个解析器重叠时不做“最具体者优先”的裁决。
/// 克隆只复制解析器句柄。
#[derive(Clone, Debug, Default)]
pub struct ResolverChain {
    resolvers: Vec<Arc<Resolver>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加解析器，返回其在链中的位置。
    pub fn push(&mut self, resolver: Resolver) -> usize {
        self.resolvers.push(Arc::new(resolver));
        self.resolvers.len() - 1
    }

    /// 返回首个命中的构建器。
    pub fn resolve(&self, action: &ActionTarget) -> Option<ConventionBuilder> {
        self.resolve_indexed(action).map(|(_, builder)| builder)
    }

    /// 返回首个命中的解析器位置及其构建器。
    pub fn resolve_indexed(&self, action: &ActionTarget) -> Option<(usize, ConventionBuilder)> {
        self.resolvers
            .iter()
            .enumerate()
            .find_map(|(index, resolver)| resolver.resolve(action).map(|builder| (index, builder)))
    }

    pub fn get(&self, index: usize) -> Option<&Resolver> {
        self.resolvers.get(index).map(Arc::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resolver> {
        self.resolvers.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_endpoint_core::{Controller, ControllerBase, ControllerType};

    struct AdminController;

    impl Controller for AdminController {
        fn controller_type() -> ControllerType {
            ControllerType::new("AdminController", "app")
        }
    }

    #[test]
    fn first_registered_resolver_wins() {
        let admin = ConventionBuilder::new();
        let all = ConventionBuilder::new();
        let mut chain = ResolverChain::new();
        chain.push(Resolver::for_capability(
            TypeCapability::of::<AdminController>(),
            admin.clone(),
        ));
        chain.push(Resolver::for_capability(
            TypeCapability::of::<ControllerBase>(),
            all.clone(),
        ));

        let admin_action = ActionTarget::of::<AdminController, _>("Dashboard");
        let (index, owner) = chain.resolve_indexed(&admin_action).expect("claimed");
        assert_eq!(index, 0);
        assert!(owner.same_as(&admin));

        let home_action = ActionTarget::new(ControllerType::new("HomeController", "app"), "Index");
        assert!(chain.resolve(&home_action).expect("claimed").same_as(&all));
    }

    #[test]
    fn empty_chain_claims_nothing() {
        let chain = ResolverChain::new();
        let action = ActionTarget::of::<AdminController, _>("Dashboard");
        assert!(chain.resolve(&action).is_none());
    }
}
