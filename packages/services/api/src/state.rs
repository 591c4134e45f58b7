//! API 앱 상태

use crate::config::Config;
use crate::db::StoreDb;
use crate::routes::RouteTable;

/// 앱 상태
///
/// 모든 핸들러에서 공유하는 상태입니다. 라우팅 테이블은 기동 시 한 번
/// 구성되어 주입됩니다.
pub struct AppState {
    /// 설정
    pub config: Config,

    /// 데이터 스토어
    pub db: StoreDb,

    /// 역할별 라우팅 테이블
    pub routes: RouteTable,
}

impl AppState {
    /// 새 상태 생성
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let db = StoreDb::connect(&config.database_url).await?;

        Ok(Self {
            config: config.clone(),
            db,
            routes: RouteTable::standard(),
        })
    }
}
