//! Common test utilities for integration tests
//!
//! Shared infrastructure: a mock key-distribution endpoint, RS256 signing
//! with the fixture keys, and claim builders.

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const PROJECT_ID: &str = "demo-project";

pub const SIGNING_KEY: &str = include_str!("../fixtures/signing_key.pem");
pub const SIGNING_CERT: &str = include_str!("../fixtures/signing_cert.pem");
pub const ROTATED_KEY: &str = include_str!("../fixtures/rotated_key.pem");
pub const ROTATED_CERT: &str = include_str!("../fixtures/rotated_cert.pem");

/// Mock key-distribution endpoint
pub struct MockKeyServer {
    pub server: MockServer,
    pub key_url: String,
}

impl MockKeyServer {
    /// Start a mock server serving keys under `/certs`
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let key_url = format!("{}/certs", server.uri());
        Self { server, key_url }
    }

    /// Serve `{kid: PEM}` with the given `max-age`, expecting `expected_calls` fetches
    pub async fn mock_keys(&self, keys: &[(&str, &str)], max_age: Option<u64>, expected_calls: u64) {
        self.mock_keys_delayed(keys, max_age, expected_calls, Duration::ZERO)
            .await;
    }

    /// Like [`MockKeyServer::mock_keys`], answering only after `delay`
    pub async fn mock_keys_delayed(
        &self,
        keys: &[(&str, &str)],
        max_age: Option<u64>,
        expected_calls: u64,
        delay: Duration,
    ) {
        let mut response = ResponseTemplate::new(200)
            .set_body_json(key_set(keys))
            .set_delay(delay);
        if let Some(max_age) = max_age {
            response = response.insert_header(
                "cache-control",
                format!("public, max-age={max_age}, must-revalidate, no-transform"),
            );
        }

        Mock::given(method("GET"))
            .and(path("/certs"))
            .respond_with(response)
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    /// Answer every request with `status` and a plain-text body
    pub async fn mock_failure(&self, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path("/certs"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_string(body)
                    .insert_header("cache-control", "max-age=3600"),
            )
            .mount(&self.server)
            .await;
    }

    /// Drop all mocks and recorded requests
    pub async fn reset(&self) {
        self.server.reset().await;
    }
}

/// Build a key-distribution response body
pub fn key_set(keys: &[(&str, &str)]) -> Value {
    keys.iter()
        .map(|(kid, pem)| ((*kid).to_string(), json!(pem)))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

/// Get current Unix timestamp
pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs() as i64
}

/// Claims of a valid ID token for [`PROJECT_ID`]
pub fn id_token_claims(sub: &str) -> Value {
    let now = current_timestamp();
    json!({
        "iss": format!("https://securetoken.google.com/{PROJECT_ID}"),
        "aud": PROJECT_ID,
        "auth_time": now - 60,
        "iat": now,
        "exp": now + 3600,
        "sub": sub,
        "firebase": {
            "sign_in_provider": "password",
            "identities": {"email": ["user@example.com"]}
        }
    })
}

/// Sign `claims` with RS256 using a PKCS#8 private key
pub fn sign_token(kid: &str, claims: &Value, private_pem: &str) -> String {
    let header = json!({"alg": "RS256", "kid": kid, "typ": "JWT"});
    let encode = |value: &Value| URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap());
    let signing_input = format!("{}.{}", encode(&header), encode(claims));

    let key = RsaPrivateKey::from_pkcs8_pem(private_pem).expect("Invalid RSA key");
    let signature = key
        .sign(
            Pkcs1v15Sign::new::<Sha256>(),
            &Sha256::digest(signing_input.as_bytes()),
        )
        .expect("Failed to sign test token");

    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature))
}

/// Generate a test JWT with `jsonwebtoken`
pub fn generate_test_jwt(kid: &str, claims: &Value, private_pem: &str) -> String {
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};

    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("Invalid RSA key");
    let mut header = Header::new(Algorithm::RS256);
    header.typ = Some("JWT".to_string());
    header.kid = Some(kid.to_string());

    encode(&header, claims, &key).expect("Failed to encode test JWT")
}
