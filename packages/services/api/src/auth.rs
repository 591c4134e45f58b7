//! 토큰 발급과 신원 확인
//!
//! 로그인 시 세션 토큰을 발급하고, 요청의 Bearer 토큰을 신원으로
//! 해석합니다. 토큰은 사용자당 하나만 유지되어 재로그인이 기존 세션을
//! 강제로 끝냅니다. 동시에 두 로그인이 겹치면 마지막 쓰기가 이기고 다른
//! 한쪽 토큰은 조용히 무효화됩니다 (의도된 동작).

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

use bookstall_core::auth::{bearer_token, Identity, SessionToken};
use bookstall_core::Error;

use crate::db::StoreDb;
use crate::error::{ApiError, Result};

/// 자격 증명 확인 후 세션 토큰 발급
pub async fn issue_token(
    db: &StoreDb,
    email: &str,
    password: &str,
    ttl_seconds: i64,
) -> Result<SessionToken> {
    let Some((user_id, password_hash)) = db.user_credentials(email).await? else {
        return Err(Error::InvalidCredentials.into());
    };

    if !bcrypt::verify(password, &password_hash).unwrap_or(false) {
        return Err(Error::InvalidCredentials.into());
    }

    let token = SessionToken::new(user_id, ttl_seconds);
    db.upsert_token(&token).await?;
    Ok(token)
}

/// Bearer 토큰을 신원으로 해석
///
/// 헤더 형식 오류, 알 수 없는 토큰, 만료된 토큰, 비활성 소유자를 모두
/// 동일한 Unauthenticated로 처리합니다. 만료는 발급 시각에 고정되며
/// 사용한다고 연장되지 않습니다.
pub async fn resolve_identity(db: &StoreDb, headers: &HeaderMap) -> Result<Identity> {
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok());
    let Some(token) = bearer_token(header) else {
        return Err(Error::Unauthenticated.into());
    };

    let Some((user_id, is_admin, expires_at)) = db.token_owner(token).await? else {
        return Err(Error::Unauthenticated.into());
    };

    let expires_at = DateTime::parse_from_rfc3339(&expires_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::Unauthenticated)?;
    if expires_at <= Utc::now() {
        return Err(Error::Unauthenticated.into());
    }

    Ok(Identity { user_id, is_admin })
}

/// 현재 비밀번호 확인 후 새 비밀번호로 교체
pub async fn change_password(
    db: &StoreDb,
    email: &str,
    curr_password: &str,
    new_password: &str,
) -> Result<()> {
    let Some((_, password_hash)) = db.user_credentials(email).await? else {
        return Err(Error::InvalidCredentials.into());
    };

    if !bcrypt::verify(curr_password, &password_hash).unwrap_or(false) {
        return Err(Error::InvalidCredentials.into());
    }

    let new_hash = hash_password(new_password)?;
    db.update_password(email, &new_hash).await?;
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| ApiError::Internal {
        message: e.to_string(),
    })
}
