use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG`이 없을 때 사용할 필터를 만듭니다.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// 구조화된 로깅을 초기화합니다.
/// JSON 형식의 로그를 출력하며, RUST_LOG 환경 변수로 로그 레벨을 제어합니다.
/// `log` 크레이트 매크로(요청 로깅 미들웨어)도 같은 구독자로 전달됩니다.
///
/// 이미 전역 구독자가 설정되어 있으면 `false`를 반환합니다.
pub fn init_telemetry(default_level: &str) -> bool {
    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(formatting_layer)
        .try_init()
        .is_ok()
}
