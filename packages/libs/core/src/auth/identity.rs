//! 인증된 신원

use serde::{Deserialize, Serialize};

/// 요청 처리 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// 관리자
    Admin,

    /// 일반 사용자 (저작 서적을 통해 저자로도 행동)
    Reader,
}

/// 인증된 신원
///
/// 토큰 검증 후 확정된 호출자 정보입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i64,
    pub is_admin: bool,
}

impl Identity {
    pub fn role(&self) -> Role {
        if self.is_admin {
            Role::Admin
        } else {
            Role::Reader
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_identity() {
        let admin = Identity {
            user_id: 1,
            is_admin: true,
        };
        let reader = Identity {
            user_id: 2,
            is_admin: false,
        };

        assert_eq!(admin.role(), Role::Admin);
        assert_eq!(reader.role(), Role::Reader);
    }
}
