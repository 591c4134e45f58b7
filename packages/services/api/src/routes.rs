//! 역할별 라우팅 테이블
//!
//! (HTTP 메서드, 경로)를 역할별로 오퍼레이션과 스코프 규칙에 매핑합니다.
//! 역할에 없는 경로는 존재하지 않는 경로와 구분되지 않습니다. 관리자
//! 전용 경로를 일반 사용자에게 노출하지 않기 위해 Forbidden 대신 404로
//! 숨깁니다. 같은 경로라도 역할에 따라 다른 엔트리가 선택됩니다 (예:
//! GET /book은 관리자에게 전체 목록, 사용자에게 접근 가능 목록).

use std::collections::HashMap;

use axum::http::Method;

use bookstall_core::auth::Role;

/// 스코프 규칙
///
/// 오퍼레이션 호출 인자를 신원에서 어떻게 만들지 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// 신원 주입 없이 그대로 호출 (관리자 전체 조회 등)
    Unscoped,

    /// 호출자 ID를 암묵적 필터/저자 인자로 주입
    ScopedToCaller,
}

/// 바인딩되는 오퍼레이션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    ListUsers,
    ListBooks,
    PublishedBooks,
    PurchasedBooks,
    TransactionsByUser,
    TransactionsByAuthor,
    ReadingsByUser,
    ReadingsByAuthor,
    Publish,
    Purchase,
    StartReading,
    ChangePassword,
    UpdateBook,
    MarkCompleted,
    DeactivateBook,
    DeactivateUser,
}

/// 테이블 엔트리: 오퍼레이션 + 스코프 규칙
#[derive(Debug, Clone, Copy)]
pub struct RouteEntry {
    pub op: Op,
    pub scope: Scope,
}

/// 역할별 라우팅 테이블
pub struct RouteTable {
    admin: HashMap<(Method, String), RouteEntry>,
    reader: HashMap<(Method, String), RouteEntry>,
}

fn entry(op: Op, scope: Scope) -> RouteEntry {
    RouteEntry { op, scope }
}

impl RouteTable {
    /// 표준 바인딩으로 테이블 구성
    pub fn standard() -> Self {
        use Scope::{ScopedToCaller, Unscoped};

        let mut admin = HashMap::new();
        let mut reader = HashMap::new();

        let bind = |table: &mut HashMap<(Method, String), RouteEntry>,
                    method: Method,
                    path: &str,
                    e: RouteEntry| {
            table.insert((method, path.to_string()), e);
        };

        // 관리자: 전체 범위 조회와 계정/서적 관리
        bind(&mut admin, Method::GET, "/user", entry(Op::ListUsers, Unscoped));
        bind(&mut admin, Method::GET, "/book", entry(Op::ListBooks, Unscoped));
        bind(&mut admin, Method::POST, "/publish", entry(Op::Publish, Unscoped));
        bind(&mut admin, Method::POST, "/purchase", entry(Op::Purchase, ScopedToCaller));
        bind(&mut admin, Method::POST, "/reading", entry(Op::StartReading, ScopedToCaller));
        bind(&mut admin, Method::PUT, "/book", entry(Op::UpdateBook, Unscoped));
        bind(&mut admin, Method::DELETE, "/user", entry(Op::DeactivateUser, Unscoped));

        // 일반 사용자: 본인 범위 조회, 구매/열람, 본인 저작 서적 관리
        bind(&mut reader, Method::GET, "/user", entry(Op::ListUsers, ScopedToCaller));
        bind(&mut reader, Method::GET, "/book", entry(Op::ListBooks, ScopedToCaller));
        bind(&mut reader, Method::GET, "/published", entry(Op::PublishedBooks, ScopedToCaller));
        bind(&mut reader, Method::GET, "/purchased", entry(Op::PurchasedBooks, ScopedToCaller));
        bind(&mut reader, Method::GET, "/transaction/user", entry(Op::TransactionsByUser, ScopedToCaller));
        bind(&mut reader, Method::GET, "/transaction/author", entry(Op::TransactionsByAuthor, ScopedToCaller));
        bind(&mut reader, Method::GET, "/reading/user", entry(Op::ReadingsByUser, ScopedToCaller));
        bind(&mut reader, Method::GET, "/reading/author", entry(Op::ReadingsByAuthor, ScopedToCaller));
        bind(&mut reader, Method::POST, "/publish", entry(Op::Publish, ScopedToCaller));
        bind(&mut reader, Method::POST, "/purchase", entry(Op::Purchase, ScopedToCaller));
        bind(&mut reader, Method::POST, "/reading", entry(Op::StartReading, ScopedToCaller));
        // 비밀번호 변경은 본문의 자격 증명으로 인증되므로 신원 주입이 없다
        bind(&mut reader, Method::PUT, "/user", entry(Op::ChangePassword, Unscoped));
        bind(&mut reader, Method::PUT, "/book", entry(Op::UpdateBook, ScopedToCaller));
        bind(&mut reader, Method::PUT, "/completed", entry(Op::MarkCompleted, ScopedToCaller));
        bind(&mut reader, Method::DELETE, "/book", entry(Op::DeactivateBook, ScopedToCaller));

        Self { admin, reader }
    }

    /// 역할에 맞는 테이블에서 엔트리 조회
    pub fn lookup(&self, role: Role, method: &Method, path: &str) -> Option<RouteEntry> {
        let table = match role {
            Role::Admin => &self.admin,
            Role::Reader => &self.reader,
        };
        table.get(&(method.clone(), path.to_string())).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_path_differs_by_role() {
        let table = RouteTable::standard();

        let admin = table.lookup(Role::Admin, &Method::GET, "/book").unwrap();
        let reader = table.lookup(Role::Reader, &Method::GET, "/book").unwrap();

        assert_eq!(admin.op, Op::ListBooks);
        assert_eq!(admin.scope, Scope::Unscoped);
        assert_eq!(reader.op, Op::ListBooks);
        assert_eq!(reader.scope, Scope::ScopedToCaller);
    }

    #[test]
    fn test_publish_author_forced_for_reader_only() {
        let table = RouteTable::standard();

        let admin = table.lookup(Role::Admin, &Method::POST, "/publish").unwrap();
        let reader = table.lookup(Role::Reader, &Method::POST, "/publish").unwrap();

        assert_eq!(admin.scope, Scope::Unscoped);
        assert_eq!(reader.scope, Scope::ScopedToCaller);
    }

    #[test]
    fn test_role_hidden_routes() {
        let table = RouteTable::standard();

        // 관리자 전용 경로는 일반 사용자에게 보이지 않는다
        assert!(table.lookup(Role::Reader, &Method::DELETE, "/user").is_none());

        // 사용자 전용 경로는 관리자에게 보이지 않는다
        assert!(table.lookup(Role::Admin, &Method::GET, "/published").is_none());
        assert!(table.lookup(Role::Admin, &Method::DELETE, "/book").is_none());
        assert!(table.lookup(Role::Admin, &Method::PUT, "/user").is_none());
    }

    #[test]
    fn test_unknown_path_misses_both_tables() {
        let table = RouteTable::standard();

        assert!(table.lookup(Role::Admin, &Method::GET, "/nope").is_none());
        assert!(table.lookup(Role::Reader, &Method::GET, "/nope").is_none());
    }
}
