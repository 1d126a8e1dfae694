//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块负责在启动时创建文章表（如不存在）。

use crate::error::Result;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use tracing::{debug, info};

const SQLITE_DDL: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        title TEXT NOT NULL DEFAULT '',
        "desc" TEXT NOT NULL DEFAULT '',
        content TEXT NOT NULL DEFAULT '',
        author_name TEXT NOT NULL DEFAULT '',
        views INTEGER NOT NULL DEFAULT 0,
        tags TEXT NOT NULL DEFAULT '',
        cover TEXT NOT NULL DEFAULT '',
        status SMALLINT NOT NULL DEFAULT 0,
        is_delete BOOLEAN NOT NULL DEFAULT 0
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_articles_visible ON articles (status, is_delete)",
    "CREATE INDEX IF NOT EXISTS idx_articles_views ON articles (views)",
];

const POSTGRES_DDL: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS articles (
        id BIGSERIAL PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        title VARCHAR(255) NOT NULL DEFAULT '',
        "desc" TEXT NOT NULL DEFAULT '',
        content TEXT NOT NULL DEFAULT '',
        author_name VARCHAR(64) NOT NULL DEFAULT '',
        views BIGINT NOT NULL DEFAULT 0,
        tags VARCHAR(255) NOT NULL DEFAULT '',
        cover VARCHAR(512) NOT NULL DEFAULT '',
        status SMALLINT NOT NULL DEFAULT 0,
        is_delete BOOLEAN NOT NULL DEFAULT FALSE
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_articles_visible ON articles (status, is_delete)",
    "CREATE INDEX IF NOT EXISTS idx_articles_views ON articles (views)",
];

// MySQL 不支持 CREATE INDEX IF NOT EXISTS，索引随建表语句一起声明
const MYSQL_DDL: &[&str] = &[r#"CREATE TABLE IF NOT EXISTS articles (
        id BIGINT AUTO_INCREMENT PRIMARY KEY,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        title VARCHAR(255) NOT NULL DEFAULT '',
        `desc` TEXT NOT NULL,
        content LONGTEXT NOT NULL,
        author_name VARCHAR(64) NOT NULL DEFAULT '',
        views BIGINT NOT NULL DEFAULT 0,
        tags VARCHAR(255) NOT NULL DEFAULT '',
        cover VARCHAR(512) NOT NULL DEFAULT '',
        status SMALLINT NOT NULL DEFAULT 0,
        is_delete BOOLEAN NOT NULL DEFAULT FALSE,
        INDEX idx_articles_visible (status, is_delete),
        INDEX idx_articles_views (views)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#];

/// 创建文章表和索引（如不存在）
///
/// # 参数
///
/// * `conn` - 数据库连接
pub async fn ensure_schema(conn: &DatabaseConnection) -> Result<()> {
    let backend = conn.get_database_backend();
    let statements = match backend {
        DatabaseBackend::Sqlite => SQLITE_DDL,
        DatabaseBackend::Postgres => POSTGRES_DDL,
        DatabaseBackend::MySql => MYSQL_DDL,
    };

    for sql in statements {
        debug!("ensure_schema: {}", sql.lines().next().unwrap_or_default());
        conn.execute(Statement::from_string(backend, sql.to_string()))
            .await?;
    }

    info!("articles schema ready ({:?})", backend);
    Ok(())
}
