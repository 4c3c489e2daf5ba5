//! 日志初始化。
//!
//! # 教案式说明
//! - **意图（Why）**：端点注册与物化过程通过 `tracing` 输出事件，宿主需要一个开箱即用的订阅器；
//! - **逻辑（How）**：组装 `EnvFilter + fmt` 两层并设置为全局 Subscriber；过滤规则按
//!   `RUST_LOG` 环境变量、调用方配置、`info` 的顺序取第一个可用者；
//! - **契约（What）**：外部已设置全局 Subscriber 时返回 [`TelemetryError::SubscriberAlreadySet`]，不会覆盖。

use tracing::dispatcher;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

const DEFAULT_FILTER: &str = "info";

/// 日志初始化失败的原因。
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// 全局 Subscriber 已存在。
    #[error("全局 tracing Subscriber 已存在，无法覆盖")]
    SubscriberAlreadySet,
    /// 配置的过滤规则无法解析。
    #[error("日志过滤规则 `{filter}` 无法解析: {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: ParseError,
    },
    /// 设置全局 Subscriber 失败。
    #[error("设置 tracing 全局 Subscriber 失败: {0}")]
    SetGlobalSubscriber(#[from] tracing::dispatcher::SetGlobalDefaultError),
}

/// 安装全局日志订阅器。
///
/// `filter` 通常来自配置文件的 `[logging] filter`；环境变量 `RUST_LOG` 存在且合法时优先生效。
pub fn init_tracing(filter: Option<&str>) -> Result<(), TelemetryError> {
    if dispatcher::has_been_set() {
        return Err(TelemetryError::SubscriberAlreadySet);
    }

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter(filter)?)
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn build_env_filter(configured: Option<&str>) -> Result<EnvFilter, TelemetryError> {
    if let Ok(from_env) = EnvFilter::try_from_default_env() {
        return Ok(from_env);
    }
    let filter = configured.unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(filter).map_err(|source| TelemetryError::InvalidFilter {
        filter: filter.to_owned(),
        source,
    })
}
