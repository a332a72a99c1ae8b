//! Decoded claim set returned to callers

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Registered claim names stripped from [`Token::claims`]
pub const REGISTERED_CLAIMS: [&str; 6] = ["iss", "aud", "exp", "iat", "sub", "uid"];

/// Provider-specific information embedded under the `firebase` claim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Sign-in provider used to authenticate ("password", "google.com", ...)
    #[serde(default, deserialize_with = "null_as_default")]
    pub sign_in_provider: String,
    /// Tenant the user belongs to, if multi-tenancy is in use
    #[serde(default, deserialize_with = "null_as_default")]
    pub tenant: String,
    /// Provider-specific identities of the user
    #[serde(default, deserialize_with = "null_as_default")]
    pub identities: Map<String, Value>,
}

/// A verified token
///
/// Values are only handed out by [`TokenVerifier`](crate::TokenVerifier) after
/// content, timestamp and signature checks have all passed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Time the user authenticated (epoch seconds)
    #[serde(default, deserialize_with = "null_as_default")]
    pub auth_time: i64,
    /// `iss`
    #[serde(rename = "iss", default, deserialize_with = "null_as_default")]
    pub issuer: String,
    /// `aud`
    #[serde(rename = "aud", default, deserialize_with = "null_as_default")]
    pub audience: String,
    /// `exp` (epoch seconds)
    #[serde(rename = "exp", default, deserialize_with = "null_as_default")]
    pub expires: i64,
    /// `iat` (epoch seconds)
    #[serde(rename = "iat", default, deserialize_with = "null_as_default")]
    pub issued_at: i64,
    /// `sub`
    #[serde(
        rename = "sub",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub subject: String,
    /// Stable user identifier; equal to `subject` once verified
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub uid: String,
    /// Provider sub-object
    #[serde(rename = "firebase", default, deserialize_with = "null_as_default")]
    pub provider: ProviderInfo,
    /// Every claim except the registered ones
    #[serde(skip)]
    pub claims: Map<String, Value>,
}

impl Token {
    /// Look up an additional claim
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }
}

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Drop the registered claim names from a raw claim map
pub(crate) fn strip_registered_claims(mut claims: Map<String, Value>) -> Map<String, Value> {
    for name in REGISTERED_CLAIMS {
        claims.remove(name);
    }
    claims
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_full_payload() {
        let token: Token = serde_json::from_value(json!({
            "iss": "https://securetoken.google.com/p",
            "aud": "p",
            "auth_time": 1_700_000_000,
            "iat": 1_700_000_100,
            "exp": 1_700_003_700,
            "sub": "user-1",
            "firebase": {
                "sign_in_provider": "password",
                "identities": {"email": ["a@example.com"]}
            }
        }))
        .unwrap();

        assert_eq!(token.subject, "user-1");
        assert_eq!(token.provider.sign_in_provider, "password");
        assert!(token.provider.tenant.is_empty());
        assert!(token.provider.identities.contains_key("email"));
        assert!(token.claims.is_empty());
    }

    #[test]
    fn test_missing_fields_default() {
        let token: Token = serde_json::from_value(json!({})).unwrap();
        assert_eq!(token, Token::default());
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let token: Token = serde_json::from_str(
            r#"{"sub":"u","auth_time":null,"uid":null,
                "firebase":{"sign_in_provider":"password","tenant":null,"identities":null}}"#,
        )
        .unwrap();
        assert_eq!(token.subject, "u");
        assert_eq!(token.auth_time, 0);
        assert_eq!(token.provider.sign_in_provider, "password");
        assert!(token.provider.tenant.is_empty());
        assert!(token.provider.identities.is_empty());

        let token: Token = serde_json::from_str(r#"{"sub":"u","firebase":null}"#).unwrap();
        assert_eq!(token.provider, ProviderInfo::default());
    }

    #[test]
    fn test_strip_registered_claims() {
        let raw = json!({
            "iss": "x", "aud": "x", "exp": 1, "iat": 1, "sub": "x", "uid": "x",
            "role": "admin", "auth_time": 5
        });
        let Value::Object(map) = raw else {
            unreachable!()
        };

        let claims = strip_registered_claims(map);
        assert_eq!(claims.len(), 2);
        assert_eq!(claims["role"], "admin");
        assert!(claims.contains_key("auth_time"));
    }
}
