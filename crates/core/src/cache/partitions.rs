//! Partition bookkeeping.
//!
//! A partition is a row in `partitions`; its entries reference it with
//! `ON DELETE CASCADE`, so deleting the row drops the whole partition.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// Create a partition if it does not exist yet.
    ///
    /// Returns true if the partition was newly created.
    pub async fn create_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(inserted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List partition names in creation order.
    pub async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and every entry in it.
    ///
    /// Returns false if the partition did not exist.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
