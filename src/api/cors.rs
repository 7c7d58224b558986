use crate::config::CorsConfig;
use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

/// Headers that grant a cross-origin caller anything
const CORS_RESPONSE_HEADERS: [header::HeaderName; 6] = [
    header::ACCESS_CONTROL_ALLOW_ORIGIN,
    header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
    header::ACCESS_CONTROL_ALLOW_METHODS,
    header::ACCESS_CONTROL_ALLOW_HEADERS,
    header::ACCESS_CONTROL_EXPOSE_HEADERS,
    header::ACCESS_CONTROL_MAX_AGE,
];

/// CORS policy for the frontend: listed origins only, GET only, with credentials.
///
/// Headers are mirrored from the preflight rather than wildcarded because
/// credentialed responses may not use `*`. Requests from any other origin get
/// no `Access-Control-*` headers at all.
#[derive(Clone)]
pub struct CorsPolicy {
    origins: Arc<[HeaderValue]>,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Result<Self> {
        let origins = config
            .allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("Invalid CORS origin {:?}", origin))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            origins: origins.into(),
        })
    }

    fn is_allowed(&self, origin: &HeaderValue) -> bool {
        self.origins.contains(origin)
    }

    fn layer(&self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.origins.iter().cloned()))
            .allow_methods([Method::GET])
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    }

    /// Wrap every route of `router` in the policy
    pub fn apply(self, router: Router) -> Router {
        let layer = self.layer();
        router
            .layer(layer)
            .layer(middleware::from_fn_with_state(self, strip_disallowed))
    }
}

/// tower-http still emits its static headers for unlisted origins; drop them
async fn strip_disallowed(State(policy): State<CorsPolicy>, request: Request, next: Next) -> Response {
    let disallowed = request
        .headers()
        .get(header::ORIGIN)
        .is_some_and(|origin| !policy.is_allowed(origin));

    let mut response = next.run(request).await;
    if disallowed {
        remove_cors_headers(response.headers_mut());
    }
    response
}

fn remove_cors_headers(headers: &mut HeaderMap) {
    for name in CORS_RESPONSE_HEADERS {
        headers.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode, routing::get};
    use tower::ServiceExt;

    const ALLOWED: &str = "https://atlas.example";

    fn app() -> Router {
        let config = CorsConfig {
            allowed_origins: vec![ALLOWED.to_string(), "http://localhost:3000".to_string()],
        };
        CorsPolicy::from_config(&config)
            .unwrap()
            .apply(Router::new().route("/visit", get(|| async { "ok" })))
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/visit")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-steal")
            .body(Body::empty())
            .unwrap()
    }

    fn simple_get(origin: &str) -> Request<Body> {
        Request::builder()
            .uri("/visit")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap()
    }

    fn assert_no_cors_headers(headers: &HeaderMap) {
        for name in CORS_RESPONSE_HEADERS {
            assert!(headers.get(&name).is_none(), "unexpected {name} header");
        }
    }

    #[tokio::test]
    async fn preflight_from_allowed_origin() {
        let response = app().oneshot(preflight(ALLOWED)).await.unwrap();
        let headers = response.headers();

        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "x-steal");
    }

    #[tokio::test]
    async fn preflight_from_unknown_origin_gets_no_cors_headers() {
        let response = app()
            .oneshot(preflight("https://evil.example"))
            .await
            .unwrap();

        assert_no_cors_headers(response.headers());
    }

    #[tokio::test]
    async fn simple_get_grants_only_listed_origins() {
        for (origin, allowed) in [
            (ALLOWED, true),
            ("http://localhost:3000", true),
            ("https://atlas.example.evil", false),
            ("https://evil.example", false),
        ] {
            let response = app().oneshot(simple_get(origin)).await.unwrap();
            let headers = response.headers();

            assert_eq!(response.status(), StatusCode::OK);
            if allowed {
                assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], origin);
                assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
            } else {
                assert_no_cors_headers(headers);
            }
        }
    }

    #[tokio::test]
    async fn same_origin_request_is_untouched() {
        let request = Request::builder().uri("/visit").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn empty_origin_list_refuses_everyone() {
        let app = CorsPolicy::from_config(&CorsConfig::default())
            .unwrap()
            .apply(Router::new().route("/visit", get(|| async { "ok" })));

        let response = app.oneshot(preflight(ALLOWED)).await.unwrap();

        assert_no_cors_headers(response.headers());
    }

    #[test]
    fn invalid_origin_is_a_config_error() {
        let config = CorsConfig {
            allowed_origins: vec!["https://bad\norigin".to_string()],
        };
        assert!(CorsPolicy::from_config(&config).is_err());
    }
}
