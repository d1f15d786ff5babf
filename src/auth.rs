use std::{convert::Infallible, fmt};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, roles::ClaimedRole};

/// Claims
///
/// Payload expected inside a bearer token when the gate runs in
/// [`CredentialMode::BearerJwt`]. Only `role` is consulted by the gate; the
/// remaining fields belong to the issuer.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the caller's identifier at the issuer.
    pub sub: String,
    /// Claimed role, as issued.
    #[serde(default)]
    pub role: Option<String>,
    /// Expiration time. Expired tokens count as absent.
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
}

/// CredentialMode
///
/// How the identity token is interpreted.
///
/// - `Cookie`: the token cookie is an opaque marker. Its presence is trusted and
///   the role cookie is taken verbatim. No integrity check happens here; the
///   surrounding system is responsible for making these cookies unforgeable.
/// - `BearerJwt`: the token is an HMAC-signed JWT. A token that fails
///   verification is treated as no token at all, and the role is read from the
///   verified claims instead of a cookie.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialMode {
    Cookie,
    BearerJwt { secret: String },
}

impl fmt::Debug for CredentialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialMode::Cookie => f.write_str("Cookie"),
            CredentialMode::BearerJwt { .. } => f
                .debug_struct("BearerJwt")
                .field("secret", &"<redacted>")
                .finish(),
        }
    }
}

/// CredentialSettings
///
/// Names of the transport values the extractor reads, plus the mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialSettings {
    pub token_cookie: String,
    pub role_cookie: String,
    pub mode: CredentialMode,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            token_cookie: "token".to_string(),
            role_cookie: "role".to_string(),
            mode: CredentialMode::Cookie,
        }
    }
}

/// CallerCredential
///
/// What the caller presented on this request. Token presence and the role claim
/// are independent: a token without a role is a valid (and unsatisfying) state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallerCredential {
    pub has_token: bool,
    pub claimed_role: Option<ClaimedRole>,
}

impl CallerCredential {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(has_token: bool, claimed_role: Option<&str>) -> Self {
        Self {
            has_token,
            claimed_role: claimed_role.map(ClaimedRole::parse),
        }
    }
}

/// Reads the caller's credential from request headers.
///
/// Never fails: anything missing, empty or unverifiable simply shows up as an
/// absent token or an absent role.
pub fn extract_credential(headers: &HeaderMap, settings: &CredentialSettings) -> CallerCredential {
    match &settings.mode {
        CredentialMode::Cookie => CallerCredential {
            has_token: read_cookie(headers, &settings.token_cookie).is_some(),
            claimed_role: read_cookie(headers, &settings.role_cookie)
                .map(|role| ClaimedRole::parse(&role)),
        },
        CredentialMode::BearerJwt { secret } => {
            let Some(token) =
                bearer_token(headers).or_else(|| read_cookie(headers, &settings.token_cookie))
            else {
                return CallerCredential::anonymous();
            };

            let decoding_key = DecodingKey::from_secret(secret.as_bytes());
            let mut validation = Validation::default();
            validation.validate_exp = true;

            match decode::<Claims>(&token, &decoding_key, &validation) {
                Ok(data) => CallerCredential {
                    has_token: true,
                    claimed_role: data
                        .claims
                        .role
                        .filter(|role| !role.is_empty())
                        .map(|role| ClaimedRole::parse(&role)),
                },
                Err(e) => {
                    tracing::debug!(error = %e, "bearer credential failed verification");
                    CallerCredential::anonymous()
                }
            }
        }
    }
}

/// Value of the named cookie, if present and non-empty. All `Cookie` headers
/// are searched; the first occurrence wins. One pair of surrounding double
/// quotes is removed.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| {
            value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value)
                .to_string()
        })
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// CallerCredential Extractor
///
/// Lets the gate middleware and handlers take a `CallerCredential` argument.
/// Extraction cannot reject; a caller with nothing gets an anonymous credential.
impl<S> FromRequestParts<S> for CallerCredential
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        Ok(extract_credential(&parts.headers, &config.credentials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;
    use axum::http::HeaderValue;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn reads_token_and_role_cookies() {
        let headers = headers_with_cookie("theme=dark; token=abc123; role=hr");
        let credential = extract_credential(&headers, &CredentialSettings::default());
        assert!(credential.has_token);
        assert_eq!(credential.claimed_role, Some(ClaimedRole::Known(Role::Hr)));
    }

    #[test]
    fn token_without_role_is_kept_distinct() {
        let headers = headers_with_cookie("token=abc123");
        let credential = extract_credential(&headers, &CredentialSettings::default());
        assert_eq!(credential, CallerCredential::new(true, None));

        let headers = headers_with_cookie("role=ceo");
        let credential = extract_credential(&headers, &CredentialSettings::default());
        assert_eq!(credential, CallerCredential::new(false, Some("ceo")));
    }

    #[test]
    fn empty_cookie_values_count_as_absent() {
        let headers = headers_with_cookie("token=; role=");
        let credential = extract_credential(&headers, &CredentialSettings::default());
        assert_eq!(credential, CallerCredential::anonymous());
    }

    #[test]
    fn quoted_cookie_values_are_unwrapped() {
        let headers = headers_with_cookie(r#"token="abc123"; role="hr""#);
        let credential = extract_credential(&headers, &CredentialSettings::default());
        assert_eq!(credential, CallerCredential::new(true, Some("hr")));

        let headers = headers_with_cookie(r#"token=""; role="""#);
        let credential = extract_credential(&headers, &CredentialSettings::default());
        assert_eq!(credential, CallerCredential::anonymous());

        // A lone quote is not a quoted value.
        let headers = headers_with_cookie(r#"token=t; role="hr"#);
        let credential = extract_credential(&headers, &CredentialSettings::default());
        assert_eq!(credential, CallerCredential::new(true, Some("\"hr")));
    }

    #[test]
    fn cookie_names_must_match_exactly() {
        let headers = headers_with_cookie("access_token=abc; roles=ceo");
        let credential = extract_credential(&headers, &CredentialSettings::default());
        assert_eq!(credential, CallerCredential::anonymous());
    }

    #[test]
    fn custom_cookie_names() {
        let settings = CredentialSettings {
            token_cookie: "sid".to_string(),
            role_cookie: "org_role".to_string(),
            mode: CredentialMode::Cookie,
        };
        let headers = headers_with_cookie("sid=1; org_role=manager");
        let credential = extract_credential(&headers, &settings);
        assert_eq!(credential, CallerCredential::new(true, Some("manager")));
    }

    #[test]
    fn unrecognized_role_claim_is_preserved() {
        let headers = headers_with_cookie("token=1; role=root");
        let credential = extract_credential(&headers, &CredentialSettings::default());
        assert_eq!(
            credential.claimed_role,
            Some(ClaimedRole::Unrecognized("root".to_string()))
        );
    }

    #[test]
    fn jwt_mode_ignores_garbage_tokens() {
        let settings = CredentialSettings {
            mode: CredentialMode::BearerJwt {
                secret: "secret".to_string(),
            },
            ..CredentialSettings::default()
        };
        let mut headers = headers_with_cookie("role=ceo");
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer not-a-jwt"),
        );
        assert_eq!(
            extract_credential(&headers, &settings),
            CallerCredential::anonymous()
        );
    }

    #[test]
    fn debug_output_hides_jwt_secret() {
        let mode = CredentialMode::BearerJwt {
            secret: "hunter2".to_string(),
        };
        assert!(!format!("{mode:?}").contains("hunter2"));
    }
}
