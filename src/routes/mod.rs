mod auth;
pub mod cookie;
mod health_check;

pub use auth::{get_current_principal, login, logout, refresh, PrincipalResponse, TokenResponse};
pub use health_check::health_check;
