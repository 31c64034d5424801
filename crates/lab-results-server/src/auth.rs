//! HTTP Basic authentication for staff routes.

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lab_results_core::{check_password, Role, StaffUser};

use crate::error::{ApiError, ApiResult};
use crate::{run_blocking, AppState};

/// Username and password from an `Authorization: Basic` header.
#[derive(Debug, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Parse the `Authorization` header. `None` when absent or not Basic.
pub fn basic_credentials(headers: &HeaderMap) -> Option<BasicCredentials> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

impl AppState {
    /// Authenticate the caller and check it has at least `required`.
    ///
    /// Only the account lookup holds the service; the Argon2 check runs on
    /// the blocking pool after the lock is released.
    pub async fn authorize(&self, headers: &HeaderMap, required: Role) -> ApiResult<StaffUser> {
        let BasicCredentials { username, password } = basic_credentials(headers)
            .ok_or_else(|| ApiError::unauthorized("Debe iniciar sesión"))?;

        let lookup = username.clone();
        let account = self.with_service(move |service| service.find_user(&lookup)).await?;
        let user = match account {
            Some(account) => {
                run_blocking(move || check_password(account, &password).map_err(ApiError::from))
                    .await?
            }
            None => None,
        };
        let user = user.ok_or_else(|| {
            tracing::warn!(username = %username, "rejected login");
            ApiError::unauthorized("Usuario o contraseña incorrectos")
        })?;

        if !user.role().allows(required) {
            return Err(ApiError::forbidden("Acceso denegado"));
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_parse_basic() {
        let encoded = STANDARD.encode("admin:clave:con:dos-puntos");
        let parsed = basic_credentials(&headers_with(&format!("Basic {}", encoded))).unwrap();
        assert_eq!(parsed.username, "admin");
        assert_eq!(parsed.password, "clave:con:dos-puntos");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(basic_credentials(&headers_with("Bearer abc")).is_none());
        assert!(basic_credentials(&headers_with("Basic !!!")).is_none());
        assert!(basic_credentials(&HeaderMap::new()).is_none());
    }
}
