//! Tower Service implementation for token verification
//!
//! Flow for each request:
//! 1. Read the token from the auth header, dropping a `Bearer ` prefix
//! 2. Verify it with the shared [`TokenVerifier`]
//! 3. On success, replace any client-supplied identity headers with the
//!    verified ones, attach the [`Token`] to the extensions and forward
//! 4. On failure, answer `401 Unauthorized` without calling the inner service

use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::Value;
use tower_service::Service;
use tracing::{debug, warn};

use crate::token::Token;
use crate::verifier::TokenVerifier;

use super::VerifyLayerConfig;

/// Future type for [`VerifyService`] responses
pub type VerifyServiceFuture<T, E> = BoxFuture<'static, Result<T, E>>;

/// Tower Service that only forwards requests bearing a valid token
#[derive(Debug, Clone)]
pub struct VerifyService<S> {
    inner: S,
    verifier: Arc<TokenVerifier>,
    config: VerifyLayerConfig,
}

impl<S> VerifyService<S> {
    /// Create a new verifying service
    pub fn new(inner: S, verifier: Arc<TokenVerifier>, config: VerifyLayerConfig) -> Self {
        Self {
            inner,
            verifier,
            config,
        }
    }

    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the inner service
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// The shared verifier
    pub fn verifier(&self) -> &Arc<TokenVerifier> {
        &self.verifier
    }
}

impl<S, B, ResBody> Service<http::Request<B>> for VerifyService<S>
where
    S: Service<http::Request<B>, Response = http::Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send + 'static,
    B: Send + 'static,
    ResBody: From<&'static str> + Send + 'static,
{
    type Response = http::Response<ResBody>;
    type Error = S::Error;
    type Future = VerifyServiceFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner);
        let verifier = Arc::clone(&self.verifier);
        let config = self.config.clone();

        Box::pin(async move {
            let Some(token) = bearer_token(req.headers(), &config.auth_header) else {
                debug!(header = %config.auth_header, "Request has no bearer token");
                return Ok(unauthorized());
            };

            match verifier.verify_token(&token).await {
                Ok(verified) => {
                    forward_identity(req.headers_mut(), &verified, &config);
                    req.extensions_mut().insert(verified);
                    inner.call(req).await
                }
                Err(e) => {
                    warn!(category = e.category(), error = %e, "Rejected request");
                    Ok(unauthorized())
                }
            }
        })
    }
}

fn bearer_token(headers: &HeaderMap, auth_header: &str) -> Option<String> {
    let value = headers.get(auth_header)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn forward_identity(headers: &mut HeaderMap, token: &Token, config: &VerifyLayerConfig) {
    let spoofed: Vec<HeaderName> = headers
        .keys()
        .filter(|name| config.is_reserved_header(name.as_str()))
        .cloned()
        .collect();
    for name in spoofed {
        headers.remove(&name);
    }

    set_header(headers, &config.user_id_header, &token.uid);
    for (claim, value) in &token.claims {
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        set_header(
            headers,
            &format!("{}{claim}", config.claim_header_prefix),
            &rendered,
        );
    }
}

fn set_header(headers: &mut HeaderMap, name: &str, value: &str) {
    match (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        (Ok(name), Ok(value)) => {
            headers.insert(name, value);
        }
        _ => debug!(header = name, "Skipping claim that is not a valid header"),
    }
}

fn unauthorized<B: From<&'static str>>() -> http::Response<B> {
    let mut response = http::Response::new(B::from("Unauthorized"));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenProfile;
    use crate::keys::{StaticKeySource, parse_public_key};
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use rsa::pkcs8::DecodePrivateKey;
    use rsa::{Pkcs1v15Sign, RsaPrivateKey};
    use serde_json::json;
    use sha2::{Digest, Sha256};
    use std::collections::BTreeMap;
    use std::convert::Infallible;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tower::ServiceExt;

    const SIGNING_KEY: &str = include_str!("../../tests/fixtures/signing_key.pem");
    const SIGNING_CERT: &str = include_str!("../../tests/fixtures/signing_cert.pem");

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    fn signed_token(extra: Value) -> String {
        let header = json!({"alg": "RS256", "kid": "k1", "typ": "JWT"});
        let mut payload = json!({
            "iss": "https://securetoken.google.com/demo",
            "aud": "demo",
            "sub": "user-1",
            "iat": now(),
            "exp": now() + 3600,
        });
        if let (Value::Object(payload), Value::Object(extra)) = (&mut payload, extra) {
            payload.extend(extra);
        }

        let enc = |v: &Value| URL_SAFE_NO_PAD.encode(serde_json::to_vec(v).unwrap());
        let signing_input = format!("{}.{}", enc(&header), enc(&payload));
        let key = RsaPrivateKey::from_pkcs8_pem(SIGNING_KEY).unwrap();
        let signature = key
            .sign(
                Pkcs1v15Sign::new::<Sha256>(),
                &Sha256::digest(signing_input.as_bytes()),
            )
            .unwrap();
        format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature))
    }

    fn verifier() -> Arc<TokenVerifier> {
        let key = parse_public_key("k1", SIGNING_CERT.as_bytes()).unwrap();
        let source = Arc::new(StaticKeySource::new(vec![key]));
        Arc::new(TokenVerifier::with_key_source("demo", TokenProfile::ID_TOKEN, source).unwrap())
    }

    /// Echoes identity headers and the extension uid back as JSON
    async fn echo(req: http::Request<String>) -> Result<http::Response<String>, Infallible> {
        let mut seen: BTreeMap<String, String> = req
            .headers()
            .iter()
            .filter(|(name, _)| name.as_str().starts_with("fb"))
            .map(|(name, value)| (name.to_string(), value.to_str().unwrap().to_string()))
            .collect();
        if let Some(token) = req.extensions().get::<Token>() {
            seen.insert("extension-uid".to_string(), token.uid.clone());
        }
        Ok(http::Response::new(serde_json::to_string(&seen).unwrap()))
    }

    async fn send(req: http::Request<String>) -> http::Response<String> {
        let service = VerifyService::new(
            tower::service_fn(echo),
            verifier(),
            VerifyLayerConfig::default(),
        );
        service.oneshot(req).await.unwrap()
    }

    fn request(auth: Option<&str>) -> http::Request<String> {
        let mut builder = http::Request::builder().uri("/protected");
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }
        builder.body(String::new()).unwrap()
    }

    fn seen(response: http::Response<String>) -> BTreeMap<String, String> {
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_str(response.body()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_forwards_identity() {
        let token = signed_token(json!({"role": "admin", "level": 3, "tags": ["a", "b"]}));
        let response = send(request(Some(&format!("Bearer {token}")))).await;

        let seen = seen(response);
        assert_eq!(seen["fb-userid"], "user-1");
        assert_eq!(seen["extension-uid"], "user-1");
        assert_eq!(seen["fbclaim-role"], "admin");
        assert_eq!(seen["fbclaim-level"], "3");
        assert_eq!(seen["fbclaim-tags"], r#"["a","b"]"#);
        assert!(!seen.contains_key("fbclaim-sub"));
    }

    #[tokio::test]
    async fn test_token_without_bearer_prefix_accepted() {
        let token = signed_token(json!({}));
        let response = send(request(Some(&token))).await;
        assert_eq!(seen(response)["fb-userid"], "user-1");
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let response = send(request(None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.body(), "Unauthorized");

        let response = send(request(Some("Bearer "))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let token = signed_token(json!({}));
        let at = token.rfind('.').unwrap() + 10;
        let flipped = if &token[at..=at] == "A" { "B" } else { "A" };
        let token = format!("{}{flipped}{}", &token[..at], &token[at + 1..]);

        let response = send(request(Some(&format!("Bearer {token}")))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.body(), "Unauthorized");
    }

    #[tokio::test]
    async fn test_spoofed_identity_headers_removed() {
        let token = signed_token(json!({}));
        let mut req = request(Some(&format!("Bearer {token}")));
        req.headers_mut()
            .insert("fb-userid", HeaderValue::from_static("attacker"));
        req.headers_mut()
            .insert("fbclaim-admin", HeaderValue::from_static("true"));

        let seen = seen(send(req).await);
        assert_eq!(seen["fb-userid"], "user-1");
        assert!(!seen.contains_key("fbclaim-admin"));
    }

    #[test]
    fn test_unrepresentable_claims_skipped() {
        let mut headers = HeaderMap::new();
        let mut token = Token {
            uid: "user-1".to_string(),
            ..Token::default()
        };
        token.claims.insert("bad name".to_string(), json!("x"));
        token.claims.insert("multi".to_string(), json!("line\nbreak"));
        token.claims.insert("ok".to_string(), json!(true));

        forward_identity(&mut headers, &token, &VerifyLayerConfig::default());
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["fb-userid"], "user-1");
        assert_eq!(headers["fbclaim-ok"], "true");
    }
}
