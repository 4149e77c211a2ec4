/// Refresh token cookie
///
/// The refresh token only ever travels in this cookie: HTTP-only so page
/// scripts cannot read it, and by default `Secure` + `SameSite=None` so a
/// front-end on another origin can send it along with credentialed requests.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::HttpRequest;

use crate::configuration::{CookieSettings, SameSitePolicy};

fn same_site(policy: SameSitePolicy) -> SameSite {
    match policy {
        SameSitePolicy::Strict => SameSite::Strict,
        SameSitePolicy::Lax => SameSite::Lax,
        SameSitePolicy::None => SameSite::None,
    }
}

fn base_cookie(settings: &CookieSettings, value: String) -> Cookie<'static> {
    let mut builder = Cookie::build(settings.name.clone(), value)
        .path(settings.path.clone())
        .http_only(settings.http_only)
        .secure(settings.secure)
        .same_site(same_site(settings.same_site));

    if let Some(domain) = &settings.domain {
        builder = builder.domain(domain.clone());
    }

    builder.finish()
}

/// Cookie carrying a refresh token for `max_age_seconds`
pub fn refresh_cookie(
    settings: &CookieSettings,
    refresh_token: String,
    max_age_seconds: i64,
) -> Cookie<'static> {
    let mut cookie = base_cookie(settings, refresh_token);
    cookie.set_max_age(Duration::seconds(max_age_seconds));
    cookie
}

/// Cookie that makes the browser drop the refresh token
pub fn removal_cookie(settings: &CookieSettings) -> Cookie<'static> {
    let mut cookie = base_cookie(settings, String::new());
    cookie.make_removal();
    cookie
}

/// Refresh token presented by the caller, if any
pub fn read_refresh_token(req: &HttpRequest, settings: &CookieSettings) -> Option<String> {
    req.cookie(&settings.name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}
