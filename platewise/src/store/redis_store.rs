use std::borrow::Cow;

use async_trait::async_trait;
use redis::{Client as RedisClient, aio::ConnectionManager, cmd};
use serde_json::Value;

use crate::{
    errors::RepoError,
    runtime::{MutationOutcome, MutationPlan, execute_plan},
    search::{self, IndexDefinition, Page, SearchParams},
    store::{DocumentStore, SearchTarget},
};

/// Redis (RedisJSON + RediSearch) backend.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(url: &str) -> Result<Self, RepoError> {
        let client = RedisClient::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }

    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Drops every key and search index under `prefix`.
    pub async fn purge(&self, prefix: &str) -> Result<u64, RepoError> {
        let mut conn = self.connection();
        let indexes: Vec<String> = cmd("FT._LIST").query_async(&mut conn).await?;
        for index in indexes.iter().filter(|name| name.starts_with(&format!("{prefix}:"))) {
            cmd("FT.DROPINDEX").arg(index).query_async::<()>(&mut conn).await?;
        }
        cleanup_pattern(&mut conn, &format!("{prefix}:*")).await
    }
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn prepare(&self, indexes: &[IndexDefinition]) -> Result<(), RepoError> {
        let mut conn = self.connection();
        for definition in indexes {
            search::ensure_index(&mut conn, definition).await?;
        }
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Option<Value>, RepoError> {
        let mut conn = self.connection();
        let raw: Option<String> = cmd("JSON.GET").arg(key).query_async(&mut conn).await?;
        raw.map(|json| parse_document(&json)).transpose()
    }

    async fn fetch_many(&self, keys: &[String]) -> Result<Vec<Option<Value>>, RepoError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection();
        let raw: Vec<Option<String>> = cmd("JSON.MGET").arg(keys).arg("$").query_async(&mut conn).await?;
        raw.into_iter()
            .map(|entry| match entry {
                // `$` replies wrap the document in a one-element array
                Some(json) => match parse_document(&json)? {
                    Value::Array(mut items) if !items.is_empty() => Ok(Some(items.swap_remove(0))),
                    Value::Array(_) => Ok(None),
                    other => Ok(Some(other)),
                },
                None => Ok(None),
            })
            .collect()
    }

    async fn exists(&self, key: &str) -> Result<bool, RepoError> {
        let mut conn = self.connection();
        let count: u64 = cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(count > 0)
    }

    async fn members(&self, set_key: &str) -> Result<Vec<String>, RepoError> {
        let mut conn = self.connection();
        Ok(cmd("SMEMBERS").arg(set_key).query_async(&mut conn).await?)
    }

    async fn member_count(&self, set_key: &str) -> Result<u64, RepoError> {
        let mut conn = self.connection();
        Ok(cmd("SCARD").arg(set_key).query_async(&mut conn).await?)
    }

    async fn lookup(&self, unique_key: &str) -> Result<Option<String>, RepoError> {
        let mut conn = self.connection();
        Ok(cmd("GET").arg(unique_key).query_async(&mut conn).await?)
    }

    async fn search(&self, target: &SearchTarget, params: &SearchParams) -> Result<Page<Value>, RepoError> {
        let mut conn = self.connection();
        search::execute_search(&mut conn, &target.index, params).await
    }

    async fn execute(&self, plan: MutationPlan) -> Result<Vec<MutationOutcome>, RepoError> {
        let mut conn = self.connection();
        execute_plan(&mut conn, &plan).await
    }
}

fn parse_document(json: &str) -> Result<Value, RepoError> {
    serde_json::from_str(json).map_err(|err| RepoError::Other {
        message: Cow::Owned(format!("failed to deserialize document: {err}")),
    })
}

/// Delete all keys matching a pattern (for test cleanup).
///
/// This performs a SCAN + DEL operation to safely delete keys without blocking Redis.
pub async fn cleanup_pattern(conn: &mut ConnectionManager, pattern: &str) -> Result<u64, RepoError> {
    const SCAN_COUNT: usize = 1000;
    let mut cursor: u64 = 0;
    let mut total_deleted: u64 = 0;

    loop {
        let (next_cursor, keys): (u64, Vec<String>) = cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(conn)
            .await?;

        if !keys.is_empty() {
            let deleted: u64 = cmd("DEL").arg(&keys).query_async(conn).await?;
            total_deleted += deleted;
        }

        cursor = next_cursor;
        if cursor == 0 {
            break;
        }
    }

    Ok(total_deleted)
}
