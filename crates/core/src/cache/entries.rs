//! Entry CRUD operations.
//!
//! Entries map a request key to a response snapshot inside one partition.
//! Writes are last-write-wins per entry; nothing spans multiple entries.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use crate::request::ResponseSnapshot;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Identity columns of a stored entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryKey {
    pub key: String,
    pub method: String,
    pub url: String,
}

impl CacheDb {
    /// Insert or replace an entry.
    ///
    /// The partition must still exist when the write runs; a write racing a
    /// partition deletion that landed first fails with
    /// `Error::PartitionRetired` and never recreates the partition.
    pub async fn put_entry(
        &self, partition: &str, key: &EntryKey, snapshot: &ResponseSnapshot,
    ) -> Result<String, Error> {
        let partition = partition.to_string();
        let key = key.clone();
        let snapshot = snapshot.clone();
        let headers_json = serde_json::to_string(&snapshot.headers)?;
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<String, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)",
                    params![partition],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::PartitionRetired(partition));
                }

                conn.execute(
                    "INSERT INTO entries (partition, key, url, method, status, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(partition, key) DO UPDATE SET
                        url = excluded.url,
                        method = excluded.method,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &partition,
                        &key.key,
                        &key.url,
                        &key.method,
                        snapshot.status as i64,
                        &headers_json,
                        &snapshot.body,
                        &stored_at,
                    ],
                )?;
                Ok(stored_at)
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by key.
    ///
    /// Returns None if the partition holds no entry for the key.
    pub async fn get_entry(&self, partition: &str, key: &str) -> Result<Option<ResponseSnapshot>, Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, headers_json, body, stored_at
                     FROM entries WHERE partition = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![partition, key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                });

                match result {
                    Ok((url, status, headers_json, body, stored_at)) => {
                        let headers: BTreeMap<String, String> = serde_json::from_str(&headers_json)?;
                        let status = u16::try_from(status)
                            .map_err(|_| Error::InvalidInput(format!("stored status out of range: {status}")))?;
                        Ok(Some(ResponseSnapshot { url, status, headers, body, stored_at: Some(stored_at) }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in a partition, ordered by URL.
    pub async fn list_entry_urls(&self, partition: &str) -> Result<Vec<String>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE partition = ?1 ORDER BY url ASC")?;
                let urls = stmt
                    .query_map(params![partition], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries across every partition.
    pub async fn count_entries(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(url: &str) -> EntryKey {
        let parsed = url::Url::parse(url).unwrap();
        EntryKey {
            key: crate::cache::hash::compute_cache_key("GET", &parsed),
            method: "GET".to_string(),
            url: url.to_string(),
        }
    }

    fn snapshot(url: &str, body: &str) -> ResponseSnapshot {
        ResponseSnapshot::new(url, 200, body).with_header("content-type", "text/css")
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.create_partition("static-v2").await.unwrap();
        let k = key("http://localhost:8080/css/common.css");

        db.put_entry("static-v2", &k, &snapshot(&k.url, "body{}")).await.unwrap();

        let stored = db.get_entry("static-v2", &k.key).await.unwrap().unwrap();
        assert_eq!(stored.body, b"body{}");
        assert_eq!(stored.content_type(), Some("text/css"));
        assert!(stored.stored_at.is_some());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.create_partition("static-v2").await.unwrap();
        let k = key("http://localhost:8080/css/common.css");

        db.put_entry("static-v2", &k, &snapshot(&k.url, "old")).await.unwrap();
        db.put_entry("static-v2", &k, &snapshot(&k.url, "new")).await.unwrap();

        let stored = db.get_entry("static-v2", &k.key).await.unwrap().unwrap();
        assert_eq!(stored.body, b"new");
        assert_eq!(db.count_entries().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.create_partition("static-v2").await.unwrap();
        assert!(db.get_entry("static-v2", "nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_into_deleted_partition_is_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let k = key("http://localhost:8080/index.html");

        let result = db.put_entry("static-v1", &k, &snapshot(&k.url, "<html>")).await;
        assert!(matches!(result, Err(Error::PartitionRetired(name)) if name == "static-v1"));
        assert!(db.list_partitions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_partition_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.create_partition("static-v1").await.unwrap();
        let k = key("http://localhost:8080/index.html");
        db.put_entry("static-v1", &k, &snapshot(&k.url, "<html>")).await.unwrap();

        db.delete_partition("static-v1").await.unwrap();

        assert_eq!(db.count_entries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_entry_urls_is_sorted() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.create_partition("static-v2").await.unwrap();
        let a = key("http://localhost:8080/a.js");
        let b = key("http://localhost:8080/b.js");
        db.put_entry("static-v2", &b, &snapshot(&b.url, "b")).await.unwrap();
        db.put_entry("static-v2", &a, &snapshot(&a.url, "a")).await.unwrap();

        assert_eq!(db.list_entry_urls("static-v2").await.unwrap(), vec![a.url.clone(), b.url.clone()]);
    }
}
