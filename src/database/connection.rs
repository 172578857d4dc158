use crate::config::DatabaseConfig;
use crate::error::AppResult;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;

pub type DbPool = DatabaseConnection;

pub async fn create_pool(config: &DatabaseConfig) -> AppResult<DbPool> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let pool = Database::connect(options).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> AppResult<()> {
    Migrator::up(pool, None).await?;
    Ok(())
}

/// 单连接内存 SQLite，已执行全部迁移
#[cfg(test)]
pub async fn test_pool() -> DbPool {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let pool = Database::connect(options)
        .await
        .expect("Failed to open in-memory sqlite");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations on sqlite");
    pool
}

/// 文件型 SQLite 多连接池，用于并发测试。
///
/// 每个连接各自开事务，写事务靠 SQLite 的写锁与 busy timeout 排队。
/// 返回的临时目录需要活到测试结束。
#[cfg(test)]
pub async fn test_pool_concurrent() -> (DbPool, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    let mut options = ConnectOptions::new(url);
    options
        .max_connections(8)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(false);
    let pool = Database::connect(options)
        .await
        .expect("Failed to open file-backed sqlite");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations on sqlite");
    (pool, dir)
}
