//! 세션 토큰
//!
//! 로그인 시 발급되는 opaque 토큰입니다. 만료 시각은 발급 시점에 고정되며
//! 사용해도 연장되지 않습니다.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 세션 토큰
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    /// 소유 사용자 ID (사용자당 토큰 하나)
    pub user_id: i64,

    /// 토큰 값 (opaque)
    pub token: String,

    /// 만료 시각
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    /// 새 토큰 발급
    pub fn new(user_id: i64, ttl_seconds: i64) -> Self {
        Self {
            user_id,
            token: Uuid::new_v4().to_string(),
            expires_at: Utc::now() + Duration::seconds(ttl_seconds),
        }
    }

    /// 만료 여부 확인
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// HTTP Authorization 헤더에서 Bearer 토큰 추출
///
/// `Bearer ` 접두사가 없으면 None을 반환합니다.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header?.strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_not_expired() {
        let token = SessionToken::new(1, 3600);
        assert!(!token.is_expired());
        assert_eq!(token.user_id, 1);
    }

    #[test]
    fn test_past_expiry_detected() {
        let token = SessionToken::new(1, -1);
        assert!(token.is_expired());
    }

    #[test]
    fn test_token_values_are_unique() {
        let a = SessionToken::new(1, 3600);
        let b = SessionToken::new(1, 3600);
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc123")), Some("abc123"));

        // 접두사 없음
        assert_eq!(bearer_token(Some("abc123")), None);

        // 다른 스킴
        assert_eq!(bearer_token(Some("Basic abc123")), None);

        // 헤더 없음
        assert_eq!(bearer_token(None), None);
    }
}
