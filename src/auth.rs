//! Session tokens and the permission gate used by every protected route.

use async_trait::async_trait;
use axum::extract::{Extension, FromRequest, RequestParts};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::Duration;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::role::Role;
use crate::models::user::User;
use crate::state::AppState;
use crate::util::current_time;

pub const SESSION_COOKIE: &str = "session";

const SESSION_LIFETIME_DAYS: i64 = 30;

/// A named capability token granted through role membership.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Permission {
    pub name: &'static str,
}

impl Permission {
    const fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub const MANAGE_USERS: Self = Self::new("MANAGE_USERS");
    pub const MANAGE_ROLES: Self = Self::new("MANAGE_ROLES");
    pub const MANAGE_EVENTS: Self = Self::new("MANAGE_EVENTS");
    pub const VIEW_ADMIN: Self = Self::new("VIEW_ADMIN");
    pub const VIEW_ATTENDANCE: Self = Self::new("VIEW_ATTENDANCE");

    pub const ALL: [Self; 5] = [
        Self::VIEW_ADMIN,
        Self::MANAGE_USERS,
        Self::MANAGE_ROLES,
        Self::MANAGE_EVENTS,
        Self::VIEW_ATTENDANCE,
    ];
}

/// The claims embedded in a signed session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The ID of the logged-in member
    pub sub: Uuid,
    /// The deprecated single-role string, kept so old accounts keep working
    pub role: String,
    /// The names of all roles assigned to the member, uppercased
    pub roles: Vec<String>,
    /// The union of all permission tokens across those roles
    pub permissions: Vec<String>,
    pub must_change_password: bool,
    pub exp: i64,
}

impl Claims {
    pub fn for_user(user: &User, roles: &[Role]) -> Self {
        let mut permissions: Vec<String> = Vec::new();
        for role in roles {
            for permission in role.permission_list() {
                if !permissions.contains(&permission) {
                    permissions.push(permission);
                }
            }
        }

        Self {
            sub: user.id,
            role: user.role.clone(),
            roles: roles.iter().map(|role| role.name.to_uppercase()).collect(),
            permissions,
            must_change_password: user.must_change_password,
            exp: (current_time() + Duration::days(SESSION_LIFETIME_DAYS)).unix_timestamp(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == "ADMIN" || self.roles.iter().any(|role| role == "ADMIN")
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_admin()
            || self
                .permissions
                .iter()
                .any(|granted| granted == permission.name)
    }

    pub fn ensure(&self, permission: Permission) -> ApiResult<()> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(Some(permission.name)))
        }
    }
}

/// Signs and verifies session tokens with the `SESSION_SECRET` key.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue(&self, claims: &Claims) -> ApiResult<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|err| anyhow::anyhow!("Failed to sign session token: {}", err).into())
    }

    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|_| ApiError::Unauthorized)
    }
}

fn session_cookie(cookie_header: &str) -> Option<&str> {
    cookie_header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value)
    })
}

fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    bearer.or_else(|| {
        headers
            .get(COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(session_cookie)
    })
}

/// A verified session that may still be forced through the password-change
/// flow. Only the password-change route should accept this directly.
pub struct AnySession(pub Claims);

/// A verified session whose password is current. Everything else uses this.
pub struct Session(pub Claims);

#[async_trait]
impl<B: Send> FromRequest<B> for AnySession {
    type Rejection = ApiError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let Extension(state) = Extension::<AppState>::from_request(req)
            .await
            .map_err(|_| anyhow::anyhow!("Application state is missing"))?;
        let token = token_from_headers(req.headers()).ok_or(ApiError::Unauthorized)?;
        let claims = state.sessions.verify(token)?;

        Ok(Self(claims))
    }
}

#[async_trait]
impl<B: Send> FromRequest<B> for Session {
    type Rejection = ApiError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let AnySession(claims) = AnySession::from_request(req).await?;
        if claims.must_change_password {
            return Err(ApiError::PasswordChangeRequired);
        }

        Ok(Self(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_with(role: &str, roles: &[&str], permissions: &[&str]) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            role: role.to_owned(),
            roles: roles.iter().map(|role| role.to_string()).collect(),
            permissions: permissions
                .iter()
                .map(|permission| permission.to_string())
                .collect(),
            must_change_password: false,
            exp: (current_time() + Duration::days(1)).unix_timestamp(),
        }
    }

    #[test]
    fn legacy_admin_role_passes_every_check() {
        let claims = claims_with("ADMIN", &[], &[]);
        for permission in Permission::ALL {
            assert!(claims.ensure(permission).is_ok());
        }
    }

    #[test]
    fn admin_role_membership_passes_every_check() {
        let claims = claims_with("USER", &["ADMIN"], &[]);
        assert!(claims.ensure(Permission::MANAGE_ROLES).is_ok());
    }

    #[test]
    fn granted_permission_passes_only_its_own_check() {
        let claims = claims_with("USER", &["PLANNER"], &["MANAGE_EVENTS"]);
        assert!(claims.ensure(Permission::MANAGE_EVENTS).is_ok());
        assert!(matches!(
            claims.ensure(Permission::MANAGE_USERS),
            Err(ApiError::Forbidden(Some("MANAGE_USERS")))
        ));
    }

    #[test]
    fn issued_tokens_round_trip() {
        let keys = SessionKeys::new(b"test-secret");
        let claims = claims_with("USER", &["PLANNER"], &["MANAGE_EVENTS"]);

        let token = keys.issue(&claims).unwrap();
        let verified = keys.verify(&token).unwrap();

        assert_eq!(verified.sub, claims.sub);
        assert_eq!(verified.roles, claims.roles);
        assert_eq!(verified.permissions, claims.permissions);
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let keys = SessionKeys::new(b"test-secret");
        let other_keys = SessionKeys::new(b"other-secret");
        let token = keys.issue(&claims_with("USER", &[], &[])).unwrap();

        assert!(matches!(
            other_keys.verify(&token),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        assert_eq!(
            session_cookie("theme=dark; session=abc123; lang=fr"),
            Some("abc123")
        );
        assert_eq!(session_cookie("theme=dark"), None);
    }
}
