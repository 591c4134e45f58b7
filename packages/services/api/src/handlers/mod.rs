//! API 핸들러

pub mod account;
pub mod dispatch;
pub mod health;
