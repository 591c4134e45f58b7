use std::str::FromStr;

use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use bookstall_core::auth::SessionToken;
use bookstall_core::Error;

use crate::error::Result;

#[derive(Clone)]
pub struct StoreDb {
    pool: SqlitePool,
}

impl StoreDb {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    async fn init(&self) -> anyhow::Result<()> {
        let queries = [
            r#"CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                bank_account TEXT,
                upi_id TEXT,
                is_admin INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1
            );"#,
            r#"CREATE TABLE IF NOT EXISTS user_tokens (
                user_id INTEGER PRIMARY KEY,
                token TEXT NOT NULL UNIQUE,
                expires_at TEXT NOT NULL
            );"#,
            r#"CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                file_path TEXT NOT NULL,
                price REAL NOT NULL,
                author_id INTEGER,
                royalty REAL,
                is_active INTEGER NOT NULL DEFAULT 1
            );"#,
            r#"CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                book_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                amount REAL NOT NULL,
                created_at TEXT NOT NULL
            );"#,
            r#"CREATE TABLE IF NOT EXISTS readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                book_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                is_completed INTEGER NOT NULL DEFAULT 0
            );"#,
        ];

        for q in queries {
            sqlx::query(q).execute(&self.pool).await?;
        }

        Ok(())
    }

    // ── users ────────────────────────────────────────────────────────────────

    pub async fn insert_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        bank_account: Option<&str>,
        upi_id: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"INSERT INTO users (name, email, password_hash, bank_account, upi_id)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(bank_account)
        .bind(upi_id)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn user_credentials(&self, email: &str) -> Result<Option<(i64, String)>> {
        let row = sqlx::query(
            r#"SELECT id, password_hash FROM users WHERE email = ?1 AND is_active = 1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((r.try_get("id")?, r.try_get("password_hash")?))),
            None => Ok(None),
        }
    }

    pub async fn update_password(&self, email: &str, password_hash: &str) -> Result<()> {
        sqlx::query(
            r#"UPDATE users SET password_hash = ?1 WHERE email = ?2 AND is_active = 1"#,
        )
        .bind(password_hash)
        .bind(email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn deactivate_user(&self, user_id: i64) -> Result<()> {
        let result = sqlx::query(r#"UPDATE users SET is_active = 0 WHERE id = ?1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("no user with matching id found").into());
        }
        Ok(())
    }

    pub async fn list_users(&self, user_id: Option<i64>) -> Result<Vec<UserRow>> {
        let rows = match user_id {
            Some(id) => {
                sqlx::query_as::<_, UserRow>(
                    r#"SELECT id, name, email, bank_account, upi_id
                       FROM users WHERE is_active = 1 AND id = ?1"#,
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, UserRow>(
                    r#"SELECT id, name, email, bank_account, upi_id
                       FROM users WHERE is_active = 1"#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        if rows.is_empty() {
            return Err(Error::not_found("no user with matching id found").into());
        }
        Ok(rows)
    }

    // ── tokens ───────────────────────────────────────────────────────────────

    pub async fn upsert_token(&self, token: &SessionToken) -> Result<()> {
        // 사용자당 토큰 하나. 재로그인은 기존 토큰을 교체한다 (last write wins).
        sqlx::query(
            r#"INSERT INTO user_tokens (user_id, token, expires_at)
               VALUES (?1, ?2, ?3)
               ON CONFLICT(user_id) DO UPDATE SET
                 token=excluded.token, expires_at=excluded.expires_at"#,
        )
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn token_owner(&self, token: &str) -> Result<Option<(i64, bool, String)>> {
        let row = sqlx::query(
            r#"SELECT u.id, u.is_admin, t.expires_at
               FROM user_tokens t JOIN users u ON t.user_id = u.id
               WHERE t.token = ?1 AND u.is_active = 1"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((
                r.try_get("id")?,
                r.try_get("is_admin")?,
                r.try_get("expires_at")?,
            ))),
            None => Ok(None),
        }
    }

    // ── books ────────────────────────────────────────────────────────────────

    pub async fn insert_book(
        &self,
        name: &str,
        file_path: &str,
        price: f64,
        author_id: Option<i64>,
        royalty: Option<f64>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"INSERT INTO books (name, file_path, price, author_id, royalty)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(name)
        .bind(file_path)
        .bind(price)
        .bind(author_id)
        .bind(royalty)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn list_books_all(&self) -> Result<Vec<BookRow>> {
        let rows = sqlx::query_as::<_, BookRow>(
            r#"SELECT id, name, file_path, price, author_id, royalty, is_active FROM books"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn book_detail(&self, book_id: i64) -> Result<Vec<BookDetailRow>> {
        let rows = sqlx::query_as::<_, BookDetailRow>(
            r#"SELECT id, name, author_id, price FROM books WHERE id = ?1"#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// 구매했거나 본인이 저작한 서적은 file_path를 포함해서, 그 외의 활성
    /// (또는 플랫폼 소유) 서적은 file_path 없이 나열한다.
    pub async fn list_books_for(&self, user_id: i64) -> Result<Vec<BookListingRow>> {
        let rows = sqlx::query_as::<_, BookListingRow>(
            r#"SELECT id, name, author_id, price, file_path FROM books
               WHERE id IN (SELECT book_id FROM transactions WHERE user_id = ?1)
                  OR author_id = ?1
               UNION
               SELECT id, name, author_id, price, NULL AS file_path FROM books
               WHERE (id NOT IN (SELECT book_id FROM transactions WHERE user_id = ?1)
                      AND author_id != ?1 AND is_active = 1)
                  OR author_id IS NULL"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn books_by_author(
        &self,
        author_id: i64,
        book_id: Option<i64>,
    ) -> Result<Vec<BookRow>> {
        let rows = match book_id {
            Some(id) => {
                sqlx::query_as::<_, BookRow>(
                    r#"SELECT id, name, file_path, price, author_id, royalty, is_active
                       FROM books WHERE author_id = ?1 AND id = ?2"#,
                )
                .bind(author_id)
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, BookRow>(
                    r#"SELECT id, name, file_path, price, author_id, royalty, is_active
                       FROM books WHERE author_id = ?1"#,
                )
                .bind(author_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        if rows.is_empty() {
            return Err(Error::not_found("book not found").into());
        }
        Ok(rows)
    }

    pub async fn purchased_unread(&self, user_id: i64) -> Result<Vec<BookListingRow>> {
        let rows = sqlx::query_as::<_, BookListingRow>(
            r#"SELECT id, name, author_id, price, file_path FROM books
               WHERE id IN (SELECT book_id FROM transactions WHERE user_id = ?1
                            EXCEPT SELECT book_id FROM readings WHERE user_id = ?1)"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(Error::not_found("no purchased books left to start reading").into());
        }
        Ok(rows)
    }

    pub async fn update_book(
        &self,
        book_id: i64,
        price: Option<f64>,
        royalty: Option<f64>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE books SET price = COALESCE(?1, price), royalty = COALESCE(?2, royalty)
               WHERE id = ?3"#,
        )
        .bind(price)
        .bind(royalty)
        .bind(book_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::invalid_operation("book not found").into());
        }
        Ok(())
    }

    /// 소유권 필터를 변경문 자체에 싣는다. 0건 갱신은 "없음"과 "남의 것"을
    /// 구분하지 않고 하나의 실패로 보고한다.
    pub async fn update_book_price_owned(
        &self,
        book_id: i64,
        author_id: i64,
        price: f64,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE books SET price = ?1 WHERE id = ?2 AND author_id = ?3"#,
        )
        .bind(price)
        .bind(book_id)
        .bind(author_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::invalid_operation("book not found or not owned").into());
        }
        Ok(())
    }

    /// active → inactive 단방향 전이. 재활성화 경로는 없다.
    pub async fn deactivate_book(&self, book_id: i64, author_id: i64) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE books SET is_active = 0 WHERE id = ?1 AND author_id = ?2"#,
        )
        .bind(book_id)
        .bind(author_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::invalid_operation("book not found or not owned").into());
        }
        Ok(())
    }

    // ── transactions ─────────────────────────────────────────────────────────

    pub async fn insert_transaction(
        &self,
        user_id: i64,
        book_id: i64,
        amount: f64,
    ) -> Result<i64> {
        let guard = sqlx::query(r#"SELECT author_id, is_active FROM books WHERE id = ?1"#)
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = guard else {
            return Err(Error::invalid_operation("book not found").into());
        };
        let author_id: Option<i64> = row.try_get("author_id")?;
        let is_active: bool = row.try_get("is_active")?;

        // 저자 본인 구매 금지. 비활성 여부와 무관하게 먼저 걸러낸다.
        if author_id == Some(user_id) {
            return Err(Error::invalid_operation("author cannot purchase their own book").into());
        }
        if !is_active {
            return Err(Error::invalid_operation("book is inactivated").into());
        }

        let result = sqlx::query(
            r#"INSERT INTO transactions (book_id, user_id, amount, created_at)
               VALUES (?1, ?2, ?3, ?4)"#,
        )
        .bind(book_id)
        .bind(user_id)
        .bind(amount)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn transactions_by_user(&self, user_id: i64) -> Result<Vec<TransactionRow>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"SELECT id, book_id, user_id, amount, created_at
               FROM transactions WHERE user_id = ?1"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(Error::not_found("no matching records").into());
        }
        Ok(rows)
    }

    pub async fn transactions_by_author(&self, author_id: i64) -> Result<Vec<TransactionRow>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"SELECT t.id, t.book_id, t.user_id, t.amount, t.created_at
               FROM transactions t JOIN books b ON t.book_id = b.id
               WHERE b.author_id = ?1"#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(Error::not_found("no matching records").into());
        }
        Ok(rows)
    }

    // ── readings ─────────────────────────────────────────────────────────────

    /// 구매 이력이 없으면 거부. 이미 열람 레코드가 있으면 새로 만들지 않고
    /// 기존 레코드를 돌려준다 (멱등).
    pub async fn insert_reading(
        &self,
        user_id: i64,
        book_id: i64,
    ) -> Result<Option<ReadingRow>> {
        let purchased = sqlx::query(
            r#"SELECT id FROM transactions WHERE user_id = ?1 AND book_id = ?2 LIMIT 1"#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?
        .is_some();

        if !purchased {
            return Err(Error::invalid_operation("book not purchased").into());
        }

        if let Some(existing) = self.reading(user_id, book_id).await? {
            return Ok(Some(existing));
        }

        sqlx::query(r#"INSERT INTO readings (book_id, user_id) VALUES (?1, ?2)"#)
            .bind(book_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(None)
    }

    pub async fn reading(&self, user_id: i64, book_id: i64) -> Result<Option<ReadingRow>> {
        let row = sqlx::query_as::<_, ReadingRow>(
            r#"SELECT id, book_id, user_id, is_completed
               FROM readings WHERE user_id = ?1 AND book_id = ?2"#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn readings_by_user(&self, user_id: i64) -> Result<Vec<ReadingRow>> {
        let rows = sqlx::query_as::<_, ReadingRow>(
            r#"SELECT id, book_id, user_id, is_completed FROM readings WHERE user_id = ?1"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(Error::not_found("no matching records").into());
        }
        Ok(rows)
    }

    pub async fn readings_by_author(&self, author_id: i64) -> Result<Vec<ReadingRow>> {
        let rows = sqlx::query_as::<_, ReadingRow>(
            r#"SELECT r.id, r.book_id, r.user_id, r.is_completed
               FROM readings r JOIN books b ON r.book_id = b.id
               WHERE b.author_id = ?1"#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(Error::not_found("no matching records").into());
        }
        Ok(rows)
    }

    pub async fn mark_completed(&self, user_id: i64, book_id: i64) -> Result<()> {
        let result = sqlx::query(
            r#"UPDATE readings SET is_completed = 1 WHERE book_id = ?1 AND user_id = ?2"#,
        )
        .bind(book_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::invalid_operation("reading record not found").into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub bank_account: Option<String>,
    pub upi_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookRow {
    pub id: i64,
    pub name: String,
    pub file_path: String,
    pub price: f64,
    pub author_id: Option<i64>,
    pub royalty: Option<f64>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookListingRow {
    pub id: i64,
    pub name: String,
    pub author_id: Option<i64>,
    pub price: f64,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookDetailRow {
    pub id: i64,
    pub name: String,
    pub author_id: Option<i64>,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TransactionRow {
    pub id: i64,
    pub book_id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReadingRow {
    pub id: i64,
    pub book_id: i64,
    pub user_id: i64,
    pub is_completed: bool,
}

#[cfg(test)]
pub(crate) async fn test_db() -> StoreDb {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    let db = StoreDb { pool };
    db.init().await.unwrap();
    db
}
