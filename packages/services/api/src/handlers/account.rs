//! 가입/로그인 핸들러
//!
//! 인증 없이 접근하는 두 엔드포인트입니다. 그 외의 모든 경로는
//! 디스패처를 거칩니다.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

use crate::auth;
use crate::error::Result;
use crate::payload::{self, LoginRequest, SignupRequest};
use crate::state::AppState;

/// POST /signup
pub async fn signup(State(state): State<Arc<AppState>>, body: Bytes) -> Result<StatusCode> {
    let req: SignupRequest = payload::decode(&body)?;
    req.validate()?;

    // 이메일 중복은 스토어의 UNIQUE 제약 위반으로 보고된다
    let password_hash = auth::hash_password(&req.password)?;
    state
        .db
        .insert_user(
            &req.name,
            &req.email,
            &password_hash,
            req.account_num.as_deref(),
            req.upi_id.as_deref(),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /login
pub async fn login(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<Value>> {
    let req: LoginRequest = payload::decode(&body)?;
    req.validate()?;

    let token = auth::issue_token(
        &state.db,
        &req.email,
        &req.password,
        state.config.token_ttl_secs,
    )
    .await?;

    Ok(Json(serde_json::json!({ "status": true, "token": token.token })))
}
