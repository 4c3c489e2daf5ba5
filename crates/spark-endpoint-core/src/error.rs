//! # error 模块说明
//!
//! - 端点注册与物化阶段的全部失败路径集中在 [`RoutingError`]；
//! - 所有错误均发生在启动（装配）阶段，调用方应直接中止启动，不存在重试语义；
//! - 未被任何解析器或路由条目认领的动作不是错误，物化时静默剔除。

use std::borrow::Cow;

use thiserror::Error;

/// 端点路由错误域。
///
/// # 契约（What）
/// - 所有变体满足 `Send + Sync + 'static`，可跨线程传播；
/// - 变体携带的字符串上下文面向运维排障，不承诺稳定格式。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RoutingError {
    /// 必需的注册参数缺失或为空，在调用点立即失败，且不修改任何状态。
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        argument: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    /// 构造数据源所需的共享依赖未提供。
    #[error("unresolved dependency `{dependency}`")]
    UnresolvedDependency { dependency: Cow<'static, str> },

    /// 同一路由表内出现重名路由条目，由模板编译阶段报告。
    #[error("route name `{name}` is registered more than once")]
    DuplicateRouteName { name: String },

    /// 路由模板无法编译。
    #[error("invalid route template `{template}`: {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// 约束引用了参数策略工厂无法识别的策略。
    #[error("route parameter `{parameter}` references unknown policy `{policy}`")]
    UnknownParameterPolicy { parameter: String, policy: String },

    /// 数据源已物化，装配阶段关闭，不再接受解析器或路由条目。
    #[error("endpoint data source is already materialized; `{operation}` is no longer allowed")]
    SetupClosed { operation: Cow<'static, str> },

    /// 约定构建器已随数据源物化而封存。
    #[error("conventions are sealed once endpoints have been materialized")]
    ConventionsSealed,

    /// 约定在物化过程中再次请求同一数据源的端点。
    #[error("endpoints were requested while the same data source is being materialized")]
    MaterializationInProgress,
}

impl RoutingError {
    /// 构造 [`RoutingError::InvalidArgument`] 的便捷方法。
    pub fn invalid_argument(
        argument: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_template(template: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.to_owned(),
            reason: reason.into(),
        }
    }
}

/// 本 crate 统一使用的结果别名。
pub type Result<T, E = RoutingError> = core::result::Result<T, E>;
