//! 요청 페이로드
//!
//! 엔드포인트별 타입드 요청 구조체와 디코드/검증 단계입니다. 필드 누락과
//! 타입 불일치는 디코드에서, 값 규칙(빈 문자열, 0 이하 금액)은 validate에서
//! Validation 에러로 보고됩니다.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use bookstall_core::Error;

use crate::error::Result;

/// 요청 본문 디코드
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| Error::validation(format!("invalid request body: {}", e)).into())
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub account_num: Option<String>,
    pub upi_id: Option<String>,
}

impl SignupRequest {
    pub fn validate(&self) -> bookstall_core::Result<()> {
        if self.name.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
        {
            return Err(Error::validation("name, email and password are required"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> bookstall_core::Result<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(Error::validation("email and password are required"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub name: String,
    pub path: String,
    pub price: f64,
    pub author_id: Option<i64>,
    pub royalty: Option<f64>,
}

impl PublishRequest {
    pub fn validate(&self) -> bookstall_core::Result<()> {
        if self.name.trim().is_empty() || self.path.trim().is_empty() || self.price <= 0.0 {
            return Err(Error::validation("name, path and price are required"));
        }
        if self.royalty.is_some_and(|r| r < 0.0) {
            return Err(Error::validation("fields with invalid data: royalty"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub book_id: i64,
    pub amount: f64,
}

impl PurchaseRequest {
    pub fn validate(&self) -> bookstall_core::Result<()> {
        if self.book_id <= 0 || self.amount <= 0.0 {
            return Err(Error::validation("book_id and amount are required"));
        }
        Ok(())
    }
}

/// 열람 시작, 완독 처리, 서적 비활성화가 공유하는 본문
#[derive(Debug, Deserialize)]
pub struct BookIdRequest {
    pub book_id: i64,
}

impl BookIdRequest {
    pub fn validate(&self) -> bookstall_core::Result<()> {
        if self.book_id <= 0 {
            return Err(Error::validation("book_id required"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    pub email: String,
    pub curr_password: String,
    pub new_password: String,
}

impl PasswordChangeRequest {
    pub fn validate(&self) -> bookstall_core::Result<()> {
        if self.email.trim().is_empty()
            || self.curr_password.is_empty()
            || self.new_password.is_empty()
        {
            return Err(Error::validation("email and password are required"));
        }
        Ok(())
    }
}

/// 관리자 서적 수정: 가격/인세 중 하나 이상 필요
#[derive(Debug, Deserialize)]
pub struct BookUpdateRequest {
    pub book_id: i64,
    pub price: Option<f64>,
    pub royalty: Option<f64>,
}

impl BookUpdateRequest {
    pub fn validate(&self) -> bookstall_core::Result<()> {
        if self.book_id <= 0 {
            return Err(Error::validation("book_id required"));
        }
        if self.price.is_none() && self.royalty.is_none() {
            return Err(Error::validation("enter price or royalty"));
        }
        if self.price.is_some_and(|p| p <= 0.0) {
            return Err(Error::validation("fields with invalid data: price"));
        }
        if self.royalty.is_some_and(|r| r < 0.0) {
            return Err(Error::validation("fields with invalid data: royalty"));
        }
        Ok(())
    }
}

/// 저자 본인 서적 가격 수정
#[derive(Debug, Deserialize)]
pub struct PriceUpdateRequest {
    pub book_id: i64,
    pub price: f64,
}

impl PriceUpdateRequest {
    pub fn validate(&self) -> bookstall_core::Result<()> {
        if self.book_id <= 0 || self.price <= 0.0 {
            return Err(Error::validation("book_id and price are required"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UserDeleteRequest {
    pub user_id: i64,
}

impl UserDeleteRequest {
    pub fn validate(&self) -> bookstall_core::Result<()> {
        if self.user_id <= 0 {
            return Err(Error::validation("user_id required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_missing_field_is_validation_error() {
        let err = decode::<LoginRequest>(br#"{"email": "a@example.com"}"#).unwrap_err();
        assert!(err.to_string().starts_with("invalid request body"));
    }

    #[test]
    fn test_decode_wrong_type_is_validation_error() {
        let err =
            decode::<PurchaseRequest>(br#"{"book_id": "one", "amount": 1.0}"#).unwrap_err();
        assert!(err.to_string().starts_with("invalid request body"));
    }

    #[test]
    fn test_signup_requires_nonempty_fields() {
        let req: SignupRequest =
            decode(br#"{"name": "", "email": "a@example.com", "password": "pw"}"#).unwrap();
        assert!(req.validate().is_err());

        let req: SignupRequest = decode(
            br#"{"name": "a", "email": "a@example.com", "password": "pw", "upi_id": "a@upi"}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_publish_rejects_zero_price() {
        let req: PublishRequest =
            decode(br#"{"name": "b", "path": "/b.pdf", "price": 0.0}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_book_update_needs_price_or_royalty() {
        let req: BookUpdateRequest = decode(br#"{"book_id": 1}"#).unwrap();
        let err = req.validate().unwrap_err();
        assert_eq!(err.to_string(), "enter price or royalty");

        let req: BookUpdateRequest = decode(br#"{"book_id": 1, "royalty": 0.2}"#).unwrap();
        assert!(req.validate().is_ok());
    }
}
