/// Authentication Routes
///
/// Handles login, token refresh, logout and current principal information.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::auth::{Claims, Credentials, TokenService};
use crate::configuration::CookieSettings;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::routes::cookie::{read_refresh_token, refresh_cookie, removal_cookie};
use crate::validators::{is_valid_password_input, is_valid_username};

/// Body returned by `/login` and `/refresh`
///
/// The refresh token is never part of the body; it travels only in the
/// HTTP-only cookie.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl TokenResponse {
    fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// Principal information response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalResponse {
    pub id: u64,
    pub role: String,
    pub session_id: String,
    pub expires_at: i64,
}

/// POST /login
///
/// Authenticate with username and password.
/// Returns the access token in the body and sets the refresh token cookie.
///
/// # Errors
/// - 400: Validation error (empty or malformed username/password)
/// - 401: Invalid credentials
/// - 500: Internal server error
pub async fn login(
    form: web::Json<Credentials>,
    tokens: web::Data<TokenService>,
    cookie_config: web::Data<CookieSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let credentials = Credentials {
        username: is_valid_username(&form.username)?,
        password: is_valid_password_input(&form.password)?.to_string(),
    };

    let issued = tokens.issue(&credentials)?;
    let settings = tokens.settings();

    tracing::info!(
        request_id = %context.request_id,
        user_id = issued.principal.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok()
        .cookie(refresh_cookie(
            cookie_config.get_ref(),
            issued.refresh_token,
            settings.refresh_token_expiry,
        ))
        .json(TokenResponse::bearer(
            issued.access_token,
            settings.access_token_expiry,
        )))
}

/// POST /refresh
///
/// Mint a new access token from the refresh token cookie.
/// Under a rotating policy the cookie is replaced as well.
///
/// # Errors
/// - 401 `missing_token`: no refresh cookie on the request
/// - 401 `token_expired`: refresh token past its expiry
/// - 401 `token_invalid`: bad signature, malformed or revoked token
/// - 401 `token_reused`: an already rotated token was presented again
pub async fn refresh(
    req: HttpRequest,
    tokens: web::Data<TokenService>,
    cookie_config: web::Data<CookieSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let refresh_token =
        read_refresh_token(&req, cookie_config.get_ref()).ok_or(AuthError::MissingToken)?;

    let refreshed = tokens.refresh(&refresh_token)?;
    let settings = tokens.settings();

    tracing::info!(
        request_id = %context.request_id,
        user_id = refreshed.principal.id,
        "Token refreshed successfully"
    );

    let mut response = HttpResponse::Ok();
    if let Some(rotated) = refreshed.refresh_token {
        response.cookie(refresh_cookie(
            cookie_config.get_ref(),
            rotated,
            settings.refresh_token_expiry,
        ));
    }

    Ok(response.json(TokenResponse::bearer(
        refreshed.access_token,
        settings.access_token_expiry,
    )))
}

/// POST /logout
///
/// Always clears the refresh cookie. A tracked session behind the cookie is
/// ended as well; an unreadable cookie does not fail the logout.
pub async fn logout(
    req: HttpRequest,
    tokens: web::Data<TokenService>,
    cookie_config: web::Data<CookieSettings>,
) -> HttpResponse {
    let context = ErrorContext::new("user_logout");

    if let Some(refresh_token) = read_refresh_token(&req, cookie_config.get_ref()) {
        match tokens.revoke(&refresh_token) {
            Ok(ended) => tracing::info!(
                request_id = %context.request_id,
                session_ended = ended,
                "User logged out"
            ),
            Err(e) => context.log_error(&e),
        }
    }

    HttpResponse::NoContent()
        .cookie(removal_cookie(cookie_config.get_ref()))
        .finish()
}

/// GET /api/me
///
/// Current principal, taken from the access token claims.
/// **Requires valid JWT access token** in Authorization header.
pub async fn get_current_principal(claims: web::ReqData<Claims>) -> HttpResponse {
    let claims = claims.into_inner();

    HttpResponse::Ok().json(PrincipalResponse {
        id: claims.principal.id,
        role: claims.principal.role,
        session_id: claims.sid,
        expires_at: claims.exp,
    })
}
