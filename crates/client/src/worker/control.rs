//! Control messages posted by the host page.

use std::fmt;
use std::str::FromStr;

use menucache_core::Error;
use serde::{Deserialize, Serialize};

use super::{OfflineProxy, WorkerState};

/// A control message, identified on the wire by its `type` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMessage {
    /// Activate without waiting for old clients to close.
    #[serde(rename = "skipWaiting")]
    ActivateNow,
    /// Delete every cache partition.
    #[serde(rename = "clearCache")]
    PurgeAll,
}

impl ControlMessage {
    pub fn as_wire(self) -> &'static str {
        match self {
            ControlMessage::ActivateNow => "skipWaiting",
            ControlMessage::PurgeAll => "clearCache",
        }
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for ControlMessage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skipWaiting" => Ok(ControlMessage::ActivateNow),
            "clearCache" => Ok(ControlMessage::PurgeAll),
            other => Err(Error::InvalidInput(format!("unknown message type: {other}"))),
        }
    }
}

/// What a control message did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ControlOutcome {
    /// The worker was waiting and is now active.
    Activated { deleted: Vec<String> },
    /// Skip-waiting is recorded; the worker was not in a state to activate.
    SkipWaitingRequested { state: WorkerState },
    Purged { partitions: Vec<String> },
}

impl OfflineProxy {
    /// Handle a control message.
    ///
    /// # Errors
    ///
    /// `PurgeAll` returns `Error::PurgeIncomplete` if any partition survived;
    /// `ActivateNow` returns whatever activation failed with.
    pub async fn message(&self, message: ControlMessage) -> Result<ControlOutcome, Error> {
        tracing::info!(message = %message, "control message received");
        match message {
            ControlMessage::ActivateNow => {
                self.lifecycle.request_skip_waiting();
                let state = self.lifecycle.state().await;
                if state == WorkerState::Waiting {
                    let report = self.activate().await?;
                    return Ok(ControlOutcome::Activated { deleted: report.deleted });
                }
                Ok(ControlOutcome::SkipWaitingRequested { state })
            }
            ControlMessage::PurgeAll => {
                let partitions = self.registry.purge_all().await?;
                tracing::info!(deleted = partitions.len(), "all cache partitions purged");
                Ok(ControlOutcome::Purged { partitions })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{MockFetcher, active_proxy, proxy_with, test_config};
    use super::super::ResponseSource;
    use super::*;
    use menucache_core::{PartitionRole, ProxyRequest};
    use url::Url;

    #[test]
    fn test_parse_wire_names() {
        assert_eq!("skipWaiting".parse::<ControlMessage>().unwrap(), ControlMessage::ActivateNow);
        assert_eq!("clearCache".parse::<ControlMessage>().unwrap(), ControlMessage::PurgeAll);
        assert!(matches!("reload".parse::<ControlMessage>(), Err(Error::InvalidInput(_))));
        assert!(matches!("SKIPWAITING".parse::<ControlMessage>(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&ControlMessage::PurgeAll).unwrap();
        assert_eq!(json, "\"clearCache\"");
        let parsed: ControlMessage = serde_json::from_str("\"skipWaiting\"").unwrap();
        assert_eq!(parsed, ControlMessage::ActivateNow);
    }

    #[tokio::test]
    async fn test_activate_now_while_waiting() {
        let proxy = proxy_with(&test_config(&[]), MockFetcher::new()).await;
        proxy.install().await.unwrap();

        let outcome = proxy.message(ControlMessage::ActivateNow).await.unwrap();

        assert!(matches!(outcome, ControlOutcome::Activated { .. }));
        assert!(proxy.lifecycle().is_controlling());
    }

    #[tokio::test]
    async fn test_activate_now_before_install() {
        let proxy = proxy_with(&test_config(&[]), MockFetcher::new()).await;

        let outcome = proxy.message(ControlMessage::ActivateNow).await.unwrap();

        assert_eq!(outcome, ControlOutcome::SkipWaitingRequested { state: WorkerState::Parsed });
        assert!(proxy.lifecycle().skip_waiting_requested());
        assert!(!proxy.lifecycle().is_controlling());
    }

    #[tokio::test]
    async fn test_purge_all_then_refill() {
        let fetcher = MockFetcher::new();
        fetcher.route("http://localhost:8080/css/common.css", 200, "body{}");
        let proxy = active_proxy(fetcher.clone()).await;
        let request = ProxyRequest::get(Url::parse("http://localhost:8080/css/common.css").unwrap());
        proxy.fetch(&request).await.unwrap();
        proxy.settle().await;

        let outcome = proxy.message(ControlMessage::PurgeAll).await.unwrap();

        let ControlOutcome::Purged { partitions } = outcome else {
            panic!("expected purge outcome");
        };
        assert_eq!(partitions.len(), 2);
        assert_eq!(proxy.registry().entry_count().await.unwrap(), 0);
        assert!(proxy.registry().names().await.unwrap().is_empty());

        // The next request repopulates the current partition from the network.
        let served = proxy.fetch(&request).await.unwrap().served().unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        let partition = proxy.registry().open(PartitionRole::Static).await.unwrap();
        assert!(partition.match_request(&request).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_all_when_empty() {
        let proxy = proxy_with(&test_config(&[]), MockFetcher::new()).await;

        let outcome = proxy.message(ControlMessage::PurgeAll).await.unwrap();

        assert_eq!(outcome, ControlOutcome::Purged { partitions: vec![] });
    }
}
