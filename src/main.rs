use std::net::TcpListener;
use token_service::configuration::{get_configuration, RotationPolicy};
use token_service::startup::{build_token_service, run};
use token_service::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // 구조화된 로깅 초기화
    init_telemetry("info");

    tracing::info!("Starting application");

    // 설정 로드
    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error"
            ));
        }
    };

    if configuration.users.is_empty() {
        tracing::warn!("No users configured, every login will be rejected");
    }
    if configuration.jwt.refresh_rotation != RotationPolicy::ReuseDetection {
        tracing::warn!(
            policy = ?configuration.jwt.refresh_rotation,
            "Refresh token reuse detection is disabled, logout only clears the cookie"
        );
    }

    // 토큰 서비스 생성 (서명 키는 여기서 한 번만 만들어집니다)
    let tokens = build_token_service(&configuration).map_err(|e| {
        tracing::error!("Failed to build token service: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Token service error")
    })?;

    // 서버 주소 설정
    let address = configuration.application.address();
    tracing::info!("Binding server to address: {}", address);

    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    // 서버 실행
    let server = run(listener, tokens, configuration.cookie.clone())?;
    tracing::info!("Server started successfully");

    server.await
}
