use crate::config::CookieConfig;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

pub const VISITOR_COOKIE_NAME: &str = "visitor-id";

/// The visitor cookie sent with the request, if any.
///
/// Only presence matters; the value is never inspected.
pub fn get_visitor_cookie(cookies: &Cookies) -> Option<Cookie<'static>> {
    cookies.get(VISITOR_COOKIE_NAME).map(Cookie::into_owned)
}

/// Fresh visitor cookie carrying a random UUID
pub fn create_visitor_cookie(config: &CookieConfig) -> Cookie<'static> {
    // Browsers drop SameSite=None cookies that are not Secure
    let same_site = if config.secure {
        SameSite::None
    } else {
        SameSite::Lax
    };

    Cookie::build((VISITOR_COOKIE_NAME, Uuid::new_v4().to_string()))
        .max_age(time::Duration::days(config.max_age_days))
        .path("/")
        .secure(config.secure)
        .same_site(same_site)
        .build()
}
