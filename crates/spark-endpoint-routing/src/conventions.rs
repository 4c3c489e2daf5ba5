use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use spark_endpoint_core::{
    Convention, EndpointBuilder, MetadataKey, MetadataValue, Result, RoutingError,
};

/// 可累积约定的注册句柄。
///
/// # 教案级说明
/// - **契约 (What)**：`add` 只登记，不立即执行；所属数据源物化后封存，之后的 `add` 返回
///   [`RoutingError::ConventionsSealed`]；
/// - **便捷方法 (How)**：`with_*` 系列将常见的元数据变更包装为约定，返回 `Result<&Self>` 以便链式调用。
pub trait EndpointConventionBuilder {
    /// 追加一条约定。
    fn add(&self, convention: Convention) -> Result<()>;

    /// 以闭包形式追加约定。
    fn add_convention<F>(&self, convention: F) -> Result<&Self>
    where
        F: Fn(&mut EndpointBuilder) + Send + Sync + 'static,
        Self: Sized,
    {
        self.add(Arc::new(convention))?;
        Ok(self)
    }

    /// 为每个匹配端点写入一项元数据。
    fn with_metadata<K, V>(&self, key: K, value: V) -> Result<&Self>
    where
        K: Into<MetadataKey>,
        V: Into<MetadataValue>,
        Self: Sized,
    {
        let key = key.into();
        let value = value.into();
        self.add_convention(move |endpoint| {
            endpoint.metadata.insert(key.clone(), value.clone());
        })
    }

    /// 覆盖显示名。
    fn with_display_name<S>(&self, display_name: S) -> Result<&Self>
    where
        S: Into<String>,
        Self: Sized,
    {
        let display_name = display_name.into();
        self.add_convention(move |endpoint| endpoint.display_name.clone_from(&display_name))
    }

    /// 覆盖排序值。
    fn with_order(&self, order: i32) -> Result<&Self>
    where
        Self: Sized,
    {
        self.add_convention(move |endpoint| endpoint.order = order)
    }
}

#[derive(Default)]
struct ConventionList {
    conventions: Vec<Convention>,
    sealed: bool,
}

/// 约定构建器。
///
/// 克隆得到的是同一构建器的另一个句柄；解析器、路由条目与调用方共享同一份约定列表。
#[derive(Clone, Default)]
pub struct ConventionBuilder {
    inner: Arc<Mutex<ConventionList>>,
}

impl ConventionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按登记顺序把全部约定作用于端点，每条恰好一次。
    pub fn apply(&self, endpoint: &mut EndpointBuilder) {
        // 执行约定期间不持有约定列表的锁。
        let conventions = self.inner.lock().conventions.clone();
        for convention in &conventions {
            convention(endpoint);
        }
    }

    /// 已登记的约定数量。
    pub fn len(&self) -> usize {
        self.inner.lock().conventions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.lock().sealed
    }

    /// 判断两个句柄是否指向同一构建器。
    pub fn same_as(&self, other: &ConventionBuilder) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn seal(&self) {
        self.inner.lock().sealed = true;
    }
}

impl EndpointConventionBuilder for ConventionBuilder {
    fn add(&self, convention: Convention) -> Result<()> {
        let mut list = self.inner.lock();
        if list.sealed {
            return Err(RoutingError::ConventionsSealed);
        }
        list.conventions.push(convention);
        Ok(())
    }
}

impl fmt::Debug for ConventionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = self.inner.lock();
        f.debug_struct("ConventionBuilder")
            .field("conventions", &list.conventions.len())
            .field("sealed", &list.sealed)
            .finish()
    }
}
