//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了日志和链路追踪的初始化。

use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// 初始化日志和 OpenTelemetry Tracing
///
/// 此函数应该在应用程序启动时调用一次。日志级别优先取 `RUST_LOG`，
/// 未设置时使用 `default_filter`。
///
/// # 参数
///
/// * `service_name` - 服务名称，用作 tracer 名称
/// * `default_filter` - 默认过滤规则，例如 "info" 或 "viewsync=debug"
///
/// # 返回值
///
/// 全局 subscriber 安装成功返回 `true`；已存在其他 subscriber 时返回 `false`
pub fn init_tracing(service_name: &str, default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // 未配置导出器时 provider 不输出任何 span，只负责生成 trace 上下文
    let provider = SdkTracerProvider::builder().build();
    global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer(service_name.to_string());

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(tracing_opentelemetry::layer().with_tracer(tracer));

    tracing::subscriber::set_global_default(subscriber).is_ok()
}

/// 关闭全局 tracer provider
pub fn shutdown_tracing() {
    global::shutdown_tracer_provider();
}
