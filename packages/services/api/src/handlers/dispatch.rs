//! 인증 경로 디스패치 핸들러
//!
//! 인증이 필요한 모든 경로의 진입점입니다. 순서가 곧 규칙입니다:
//! 신원 해석 실패는 경로와 무관하게 401, 역할 테이블에 엔트리가 없으면
//! 404, 그 다음에야 스코프 규칙을 적용해 오퍼레이션을 호출하고 결과를
//! 변환합니다 (페이로드 있으면 200, 순수 변경이면 204).

use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use bookstall_core::auth::Identity;
use bookstall_core::Error;

use crate::auth;
use crate::error::{ApiError, Result};
use crate::payload::{
    self, BookIdRequest, BookUpdateRequest, PasswordChangeRequest, PriceUpdateRequest,
    PublishRequest, PurchaseRequest, UserDeleteRequest,
};
use crate::routes::{Op, RouteEntry, Scope};
use crate::state::AppState;

const BODY_LIMIT: usize = 1024 * 1024;

/// GET 경로의 선택 질의 파라미터
#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    book_id: Option<i64>,
}

pub async fn dispatch(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let (parts, body) = req.into_parts();

    let identity = match auth::resolve_identity(&state.db, &parts.headers).await {
        Ok(identity) => identity,
        Err(e) => return e.into_response(),
    };

    let Some(entry) = state
        .routes
        .lookup(identity.role(), &parts.method, parts.uri.path())
    else {
        return ApiError::from(Error::not_found("path not found")).into_response();
    };

    let query = match Query::<ListQuery>::try_from_uri(&parts.uri) {
        Ok(Query(query)) => query,
        Err(_) => {
            return ApiError::from(Error::validation("fields with invalid data: book_id"))
                .into_response()
        }
    };

    let body = match to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return ApiError::from(Error::validation("unable to read request body"))
                .into_response()
        }
    };

    match execute(&state, entry, &identity, query.book_id, &body).await {
        Ok(Some(value)) => (StatusCode::OK, Json(value)).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

fn to_json<T: Serialize>(rows: T) -> Result<Option<Value>> {
    let value = serde_json::to_value(rows).map_err(|e| ApiError::Internal {
        message: e.to_string(),
    })?;
    Ok(Some(value))
}

async fn execute(
    state: &AppState,
    entry: RouteEntry,
    identity: &Identity,
    book_id: Option<i64>,
    body: &[u8],
) -> Result<Option<Value>> {
    let caller = identity.user_id;

    match entry.op {
        Op::ListUsers => {
            let scope_user = match entry.scope {
                Scope::Unscoped => None,
                Scope::ScopedToCaller => Some(caller),
            };
            to_json(state.db.list_users(scope_user).await?)
        }

        Op::ListBooks => match entry.scope {
            Scope::Unscoped => to_json(state.db.list_books_all().await?),
            Scope::ScopedToCaller => match book_id {
                Some(id) => to_json(state.db.book_detail(id).await?),
                None => to_json(state.db.list_books_for(caller).await?),
            },
        },

        Op::PublishedBooks => to_json(state.db.books_by_author(caller, book_id).await?),
        Op::PurchasedBooks => to_json(state.db.purchased_unread(caller).await?),
        Op::TransactionsByUser => to_json(state.db.transactions_by_user(caller).await?),
        Op::TransactionsByAuthor => to_json(state.db.transactions_by_author(caller).await?),
        Op::ReadingsByUser => to_json(state.db.readings_by_user(caller).await?),
        Op::ReadingsByAuthor => to_json(state.db.readings_by_author(caller).await?),

        Op::Publish => {
            let req: PublishRequest = payload::decode(body)?;
            req.validate()?;

            // 관리자만 본문의 author_id를 쓸 수 있다 (없으면 플랫폼 소유).
            // 일반 사용자는 호출자가 곧 저자다.
            let author_id = match entry.scope {
                Scope::Unscoped => req.author_id,
                Scope::ScopedToCaller => Some(caller),
            };
            state
                .db
                .insert_book(&req.name, &req.path, req.price, author_id, req.royalty)
                .await?;
            Ok(None)
        }

        Op::Purchase => {
            let req: PurchaseRequest = payload::decode(body)?;
            req.validate()?;
            state
                .db
                .insert_transaction(caller, req.book_id, req.amount)
                .await?;
            Ok(None)
        }

        Op::StartReading => {
            let req: BookIdRequest = payload::decode(body)?;
            req.validate()?;
            match state.db.insert_reading(caller, req.book_id).await? {
                // 이미 열람 중이면 기존 레코드를 그대로 돌려준다
                Some(existing) => to_json(existing),
                None => Ok(None),
            }
        }

        Op::ChangePassword => {
            let req: PasswordChangeRequest = payload::decode(body)?;
            req.validate()?;
            auth::change_password(&state.db, &req.email, &req.curr_password, &req.new_password)
                .await?;
            Ok(None)
        }

        Op::UpdateBook => match entry.scope {
            Scope::Unscoped => {
                let req: BookUpdateRequest = payload::decode(body)?;
                req.validate()?;
                state
                    .db
                    .update_book(req.book_id, req.price, req.royalty)
                    .await?;
                Ok(None)
            }
            Scope::ScopedToCaller => {
                let req: PriceUpdateRequest = payload::decode(body)?;
                req.validate()?;
                state
                    .db
                    .update_book_price_owned(req.book_id, caller, req.price)
                    .await?;
                Ok(None)
            }
        },

        Op::MarkCompleted => {
            let req: BookIdRequest = payload::decode(body)?;
            req.validate()?;
            state.db.mark_completed(caller, req.book_id).await?;
            Ok(None)
        }

        Op::DeactivateBook => {
            let req: BookIdRequest = payload::decode(body)?;
            req.validate()?;
            state.db.deactivate_book(req.book_id, caller).await?;
            Ok(None)
        }

        Op::DeactivateUser => {
            let req: UserDeleteRequest = payload::decode(body)?;
            req.validate()?;
            state.db.deactivate_user(req.user_id).await?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request as HttpRequest};

    use crate::config::Config;
    use crate::db::test_db;
    use crate::routes::RouteTable;

    async fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            config: Config {
                port: 0,
                database_url: "sqlite::memory:".to_string(),
                token_ttl_secs: 3600,
            },
            db: test_db().await,
            routes: RouteTable::standard(),
        })
    }

    async fn seed_user(state: &AppState, name: &str, email: &str, password: &str) -> i64 {
        let hash = bcrypt::hash(password, 4).unwrap();
        state
            .db
            .insert_user(name, email, &hash, None, None)
            .await
            .unwrap()
    }

    async fn login(state: &AppState, email: &str, password: &str) -> String {
        auth::issue_token(&state.db, email, password, 3600)
            .await
            .unwrap()
            .token
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request {
        let mut builder = HttpRequest::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_unauthenticated_is_401_even_for_unknown_path() {
        let state = test_state().await;

        let resp = dispatch(
            State(state.clone()),
            request(Method::GET, "/nope", None, Value::Null),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_hidden_route_is_404_for_wrong_role() {
        let state = test_state().await;
        seed_user(&state, "a", "a@example.com", "pw").await;
        let token = login(&state, "a@example.com", "pw").await;

        // 관리자 전용 경로: 일반 사용자에게는 존재하지 않는 경로처럼 보인다
        let resp = dispatch(
            State(state.clone()),
            request(
                Method::DELETE,
                "/user",
                Some(&token),
                serde_json::json!({"user_id": 1}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_purchase_and_reading_flow() {
        let state = test_state().await;
        let author = seed_user(&state, "author", "author@example.com", "pw").await;
        seed_user(&state, "buyer", "buyer@example.com", "pw").await;
        let book = state
            .db
            .insert_book("novel", "/b/novel.epub", 10.0, Some(author), None)
            .await
            .unwrap();

        let buyer_token = login(&state, "buyer@example.com", "pw").await;

        let resp = dispatch(
            State(state.clone()),
            request(
                Method::POST,
                "/purchase",
                Some(&buyer_token),
                serde_json::json!({"book_id": book, "amount": 10.0}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = dispatch(
            State(state.clone()),
            request(
                Method::POST,
                "/reading",
                Some(&buyer_token),
                serde_json::json!({"book_id": book}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        // 멱등 재호출은 기존 레코드와 함께 200
        let resp = dispatch(
            State(state.clone()),
            request(
                Method::POST,
                "/reading",
                Some(&buyer_token),
                serde_json::json!({"book_id": book}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_self_purchase_is_400() {
        let state = test_state().await;
        let author = seed_user(&state, "author", "author@example.com", "pw").await;
        let book = state
            .db
            .insert_book("own", "/b/own.pdf", 10.0, Some(author), None)
            .await
            .unwrap();

        let token = login(&state, "author@example.com", "pw").await;
        let resp = dispatch(
            State(state.clone()),
            request(
                Method::POST,
                "/purchase",
                Some(&token),
                serde_json::json!({"book_id": book, "amount": 10.0}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reader_publish_forces_caller_as_author() {
        let state = test_state().await;
        let caller = seed_user(&state, "writer", "writer@example.com", "pw").await;
        let identity = Identity {
            user_id: caller,
            is_admin: false,
        };
        let entry = state
            .routes
            .lookup(identity.role(), &Method::POST, "/publish")
            .unwrap();

        // 본문이 다른 author_id를 주장해도 호출자로 강제된다
        let body =
            serde_json::json!({"name": "b", "path": "/b.pdf", "price": 5.0, "author_id": 999});
        execute(&state, entry, &identity, None, body.to_string().as_bytes())
            .await
            .unwrap();

        let rows = state.db.books_by_author(caller, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].author_id, Some(caller));
    }

    #[tokio::test]
    async fn test_admin_publish_keeps_body_author() {
        let state = test_state().await;
        let author = seed_user(&state, "writer", "writer@example.com", "pw").await;
        let admin = Identity {
            user_id: 999,
            is_admin: true,
        };
        let entry = state
            .routes
            .lookup(admin.role(), &Method::POST, "/publish")
            .unwrap();

        let body = serde_json::json!({"name": "b", "path": "/b.pdf", "price": 5.0, "author_id": author});
        execute(&state, entry, &admin, None, body.to_string().as_bytes())
            .await
            .unwrap();

        let rows = state.db.books_by_author(author, None).await.unwrap();
        assert_eq!(rows[0].author_id, Some(author));
    }

    #[tokio::test]
    async fn test_invalid_book_id_query_is_400() {
        let state = test_state().await;
        seed_user(&state, "a", "a@example.com", "pw").await;
        let token = login(&state, "a@example.com", "pw").await;

        let resp = dispatch(
            State(state.clone()),
            request(Method::GET, "/book?book_id=abc", Some(&token), Value::Null),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
