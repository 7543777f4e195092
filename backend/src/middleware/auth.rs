//! Authentication middleware
//!
//! Bearer tokens are issued by an external identity provider. This layer only
//! verifies them and makes the acting user available to handlers; services
//! receive the user id explicitly.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::UserRole;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    /// Require an administrator or staff member
    pub fn require_elevated(&self) -> AppResult<()> {
        if self.role.is_elevated() {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }

    /// Require an administrator
    pub fn require_admin(&self) -> AppResult<()> {
        if self.role == UserRole::Admin {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token,
        None => {
            return AppError::Unauthorized("Missing or invalid Authorization header".to_string())
                .into_response()
        }
    };

    let auth_user = match decode_jwt(token, &state.config.jwt.secret) {
        Ok(user) => user,
        Err(msg) => return AppError::Unauthorized(msg).into_response(),
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    sub: String,
    role: String,
    exp: i64,
    iat: i64,
}

/// Decode and validate JWT token
fn decode_jwt(token: &str, secret: &str) -> Result<AuthUser, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))?;

    let user_id =
        Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token".to_string())?;
    let role = claims
        .role
        .parse::<UserRole>()
        .map_err(|_| "Invalid role in token".to_string())?;

    Ok(AuthUser { user_id, role })
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(sub: &str, role: &str, secret: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            role: role.to_string(),
            exp: now + 3600,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_valid_token() {
        let user_id = Uuid::new_v4();
        let user = decode_jwt(&token(&user_id.to_string(), "staff", "s3cret"), "s3cret").unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.role, UserRole::Staff);
        assert!(user.require_elevated().is_ok());
        assert!(user.require_admin().is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_secret() {
        let t = token(&Uuid::new_v4().to_string(), "admin", "s3cret");
        assert!(decode_jwt(&t, "other").is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_role() {
        let t = token(&Uuid::new_v4().to_string(), "owner", "s3cret");
        assert_eq!(
            decode_jwt(&t, "s3cret").unwrap_err(),
            "Invalid role in token"
        );
    }

    #[tokio::test]
    async fn test_missing_user_is_rejected_with_401() {
        use axum::extract::FromRequestParts;
        use axum::http::StatusCode;

        let (mut parts, _) = axum::http::Request::new(()).into_parts();
        let rejection = CurrentUser::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_viewer_is_read_only() {
        let viewer = AuthUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Viewer,
        };
        assert!(viewer.require_elevated().is_err());
    }
}
