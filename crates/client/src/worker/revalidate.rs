//! Background revalidation of cache hits.
//!
//! A cache hit is answered immediately and refreshed afterwards. Refresh
//! tasks are tracked so shutdown and tests can wait for them; a failed
//! refresh leaves the existing entry untouched.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use menucache_core::{Error, Partition, ProxyRequest};
use tokio::task::JoinSet;

use crate::fetch::Fetcher;

pub struct Revalidator {
    fetcher: Arc<dyn Fetcher>,
    tasks: Mutex<JoinSet<()>>,
}

impl Revalidator {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher, tasks: Mutex::new(JoinSet::new()) }
    }

    /// Start refreshing `request` in `partition`. Returns immediately.
    pub fn spawn(&self, request: ProxyRequest, partition: Partition) {
        let fetcher = Arc::clone(&self.fetcher);
        let mut tasks = self.tasks();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            revalidate(fetcher.as_ref(), &request, &partition).await;
        });
    }

    /// Refreshes still running.
    pub fn pending(&self) -> usize {
        let mut tasks = self.tasks();
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    /// Wait for every refresh started so far.
    pub async fn settle(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks());
        let mut settled = 0usize;
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "revalidation task did not complete");
            }
            settled += 1;
        }
        if settled > 0 {
            tracing::debug!(settled, "revalidations settled");
        }
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn revalidate(fetcher: &dyn Fetcher, request: &ProxyRequest, partition: &Partition) {
    let response = match fetcher.fetch(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "revalidation skipped, network unavailable");
            return;
        }
    };

    if !response.is_success() {
        tracing::debug!(url = %request.url, status = response.status, "revalidation kept cached entry");
        return;
    }

    match partition.put(request, &response).await {
        Ok(_) => tracing::debug!(url = %request.url, partition = %partition.name(), "revalidated"),
        Err(Error::PartitionRetired(name)) => {
            tracing::debug!(partition = %name, url = %request.url, "partition deleted during revalidation")
        }
        Err(e) => tracing::warn!(url = %request.url, error = %e, "failed to store revalidated response"),
    }
}
