use async_trait::async_trait;
use jiff::Timestamp;
use portkey_core::repository::{
    ClickRepository, CodeReuse, ReadRepository, Result, UrlRepository,
};
use portkey_core::{
    ClickEvent, ClickId, NewClick, NewShortUrl, OwnerId, Page, ShortCode, ShortUrl, StorageError,
    UrlId,
};
use sqlx::mysql::{MySqlQueryResult, MySqlRow};
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::debug;

const SHORT_URLS_DDL: &str = include_str!("../ddl/mysql/short_urls.sql");
const CLICK_EVENTS_DDL: &str = include_str!("../ddl/mysql/click_events.sql");
const INSERT_DEADLOCK_ATTEMPTS: u32 = 5;

/// MySQL implementation of the repository contracts.
///
/// Soft delete is implemented with `deleted_at`. Uniqueness of active codes
/// is enforced by a unique index over a generated column that is NULL for
/// deleted rows; the [`CodeReuse`] policy for deleted codes is checked in the
/// same `INSERT ... SELECT` statement.
///
/// Timestamps are stored as microseconds since the Unix epoch.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
    code_reuse: CodeReuse,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            code_reuse: CodeReuse::default(),
        }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    pub fn with_code_reuse(mut self, code_reuse: CodeReuse) -> Self {
        self.code_reuse = code_reuse;
        self
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Creates the tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        for ddl in [SHORT_URLS_DDL, CLICK_EVENTS_DDL] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        }
        Ok(())
    }

    /// Deleted rows with `deleted_at` above this value still block their code.
    fn reuse_cutoff(&self, now: Timestamp) -> i64 {
        match self.code_reuse {
            CodeReuse::Never => i64::MIN,
            CodeReuse::AfterEmbargo(embargo) => now
                .checked_sub(embargo)
                .map(|cutoff| cutoff.as_microsecond())
                .unwrap_or(i64::MIN),
        }
    }

    async fn insert_unless_embargoed(
        &self,
        record: &NewShortUrl,
        cutoff: i64,
    ) -> std::result::Result<MySqlQueryResult, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO short_urls (code, original_url, owner_id, created_at, deleted_at)
            SELECT ?, ?, ?, ?, NULL
            FROM DUAL
            WHERE NOT EXISTS (
                SELECT 1
                FROM short_urls
                WHERE code = ?
                  AND deleted_at IS NOT NULL
                  AND deleted_at > ?
            )
            "#,
        )
        .bind(record.code.as_str())
        .bind(&record.original_url)
        .bind(record.owner_id.get())
        .bind(to_micros(record.created_at))
        .bind(record.code.as_str())
        .bind(cutoff)
        .execute(&self.pool)
        .await
    }
}

fn to_micros(ts: Timestamp) -> i64 {
    ts.as_microsecond()
}

fn from_micros(column: &str, value: i64) -> Result<Timestamp> {
    Timestamp::from_microsecond(value).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{value}': {e}"))
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

/// Racing inserts of one code can deadlock on the gap locks taken by the
/// `NOT EXISTS` check. InnoDB rolls one back with SQLSTATE 40001.
fn is_deadlock(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == "40001")
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn url_from_row(row: &MySqlRow) -> Result<ShortUrl> {
    let code: String = row.try_get("code").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let deleted_at: Option<i64> = row.try_get("deleted_at").map_err(map_sqlx_error)?;

    Ok(ShortUrl {
        id: UrlId::new(row.try_get("id").map_err(map_sqlx_error)?),
        code: ShortCode::new(&code).map_err(|e| StorageError::InvalidData(e.to_string()))?,
        original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
        owner_id: OwnerId::new(row.try_get("owner_id").map_err(map_sqlx_error)?),
        created_at: from_micros("created_at", created_at)?,
        deleted_at: deleted_at
            .map(|value| from_micros("deleted_at", value))
            .transpose()?,
    })
}

fn click_from_row(row: &MySqlRow) -> Result<ClickEvent> {
    let clicked_at: i64 = row.try_get("clicked_at").map_err(map_sqlx_error)?;
    let ip_address: Option<String> = row.try_get("ip_address").map_err(map_sqlx_error)?;
    let ip_address = ip_address
        .map(|raw| {
            raw.parse::<IpAddr>().map_err(|e| {
                StorageError::InvalidData(format!("invalid ip address '{raw}': {e}"))
            })
        })
        .transpose()?;

    Ok(ClickEvent {
        id: ClickId::new(row.try_get("id").map_err(map_sqlx_error)?),
        short_url_id: UrlId::new(row.try_get("short_url_id").map_err(map_sqlx_error)?),
        clicked_at: from_micros("clicked_at", clicked_at)?,
        ip_address,
        user_agent: row.try_get("user_agent").map_err(map_sqlx_error)?,
    })
}

fn inserted_id(result: &MySqlQueryResult) -> Result<i64> {
    i64::try_from(result.last_insert_id())
        .map_err(|e| StorageError::InvalidData(format!("insert id out of range: {e}")))
}

#[async_trait]
impl ReadRepository for MySqlRepository {
    async fn lookup(&self, code: &ShortCode) -> Result<Option<ShortUrl>> {
        let row = sqlx::query(
            r#"
            SELECT id, code, original_url, owner_id, created_at, deleted_at
            FROM short_urls
            WHERE code = ?
            ORDER BY (deleted_at IS NULL) DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(url_from_row).transpose()
    }

    async fn get(&self, id: UrlId) -> Result<Option<ShortUrl>> {
        let row = sqlx::query(
            r#"
            SELECT id, code, original_url, owner_id, created_at, deleted_at
            FROM short_urls
            WHERE id = ?
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(url_from_row).transpose()
    }
}

#[async_trait]
impl UrlRepository for MySqlRepository {
    async fn insert(&self, record: NewShortUrl) -> Result<ShortUrl> {
        let cutoff = self.reuse_cutoff(Timestamp::now());

        let mut attempt = 1;
        let result = loop {
            match self.insert_unless_embargoed(&record, cutoff).await {
                Err(err) if is_deadlock(&err) && attempt < INSERT_DEADLOCK_ATTEMPTS => {
                    debug!(code = %record.code, attempt, "insert deadlocked, retrying");
                    attempt += 1;
                }
                other => break other,
            }
        };

        let result = match result {
            Ok(result) if result.rows_affected() == 0 => {
                debug!(code = %record.code, "code held by a deleted record");
                return Err(StorageError::Conflict(record.code.to_string()));
            }
            Ok(result) => result,
            Err(err) if is_unique_violation(&err) => {
                return Err(StorageError::Conflict(record.code.to_string()));
            }
            Err(err) => return Err(map_sqlx_error(err)),
        };

        let id = UrlId::new(inserted_id(&result)?);
        Ok(record.into_short_url(id))
    }

    async fn list_by_owner(&self, owner: OwnerId) -> Result<Vec<ShortUrl>> {
        let rows = sqlx::query(
            r#"
            SELECT id, code, original_url, owner_id, created_at, deleted_at
            FROM short_urls
            WHERE owner_id = ?
              AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner.get())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(url_from_row).collect()
    }

    async fn soft_delete(&self, id: UrlId) -> Result<Option<ShortUrl>> {
        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET deleted_at = ?
            WHERE id = ?
              AND deleted_at IS NULL
            "#,
        )
        .bind(to_micros(Timestamp::now()))
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(id).await
    }
}

#[async_trait]
impl ClickRepository for MySqlRepository {
    async fn append(&self, click: NewClick) -> Result<ClickEvent> {
        let result = sqlx::query(
            r#"
            INSERT INTO click_events (short_url_id, clicked_at, ip_address, user_agent)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(click.short_url_id.get())
        .bind(to_micros(click.clicked_at))
        .bind(click.ip_address.map(|ip| ip.to_string()))
        .bind(click.user_agent.as_deref())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let id = ClickId::new(inserted_id(&result)?);
        Ok(click.into_event(id))
    }

    async fn count(&self, url: UrlId) -> Result<u64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM click_events
            WHERE short_url_id = ?
            "#,
        )
        .bind(url.get())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(total.max(0) as u64)
    }

    async fn count_many(&self, urls: &[UrlId]) -> Result<HashMap<UrlId, u64>> {
        let mut counts: HashMap<UrlId, u64> = urls.iter().map(|id| (*id, 0)).collect();
        if urls.is_empty() {
            return Ok(counts);
        }

        let mut query = QueryBuilder::<MySql>::new(
            "SELECT short_url_id, COUNT(*) AS clicks FROM click_events WHERE short_url_id IN (",
        );
        let mut ids = query.separated(", ");
        for url in urls {
            ids.push_bind(url.get());
        }
        ids.push_unseparated(") GROUP BY short_url_id");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        for row in rows {
            let id: i64 = row.try_get("short_url_id").map_err(map_sqlx_error)?;
            let clicks: i64 = row.try_get("clicks").map_err(map_sqlx_error)?;
            counts.insert(UrlId::new(id), clicks.max(0) as u64);
        }

        Ok(counts)
    }

    async fn list(&self, url: UrlId, page: Page) -> Result<Vec<ClickEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, short_url_id, clicked_at, ip_address, user_agent
            FROM click_events
            WHERE short_url_id = ?
            ORDER BY clicked_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(url.get())
        .bind(page.limit.unwrap_or(u64::MAX))
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(click_from_row).collect()
    }
}
