use crate::adapters::http::{send_with_retry, HttpPolicy};
use crate::domain::model::{DomainFailure, DomainOperation};
use crate::utils::error::{Result, SyncError};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Deserialize)]
pub struct DenylistPage {
    #[serde(default)]
    pub data: Vec<DenylistEntry>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

impl DenylistPage {
    pub fn next_cursor(&self) -> Option<&str> {
        self.meta
            .as_ref()?
            .pagination
            .as_ref()?
            .cursor
            .as_deref()
            .filter(|cursor| !cursor.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct PageMeta {
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenylistEntry {
    #[serde(alias = "domain")]
    pub id: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Client for a single profile's denylist.
#[derive(Clone)]
pub struct NextDnsClient {
    client: Client,
    policy: HttpPolicy,
    api_key: String,
    denylist_url: String,
}

impl NextDnsClient {
    pub fn new(
        client: Client,
        policy: HttpPolicy,
        api_base_url: &str,
        profile_id: &str,
        api_key: &str,
    ) -> Self {
        let denylist_url = format!(
            "{}/profiles/{}/denylist",
            api_base_url.trim_end_matches('/'),
            profile_id
        );
        Self {
            client,
            policy,
            api_key: api_key.to_string(),
            denylist_url,
        }
    }

    pub fn denylist_url(&self) -> &str {
        &self.denylist_url
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, &self.api_key)
    }

    async fn status_error(operation: &str, response: reqwest::Response) -> SyncError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        SyncError::ApiStatusError {
            operation: operation.to_string(),
            status,
            body,
        }
    }

    /// Fetches the whole denylist, following pagination cursors.
    pub async fn get_denylist(&self) -> Result<BTreeSet<String>> {
        let mut domains = BTreeSet::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors: HashSet<String> = HashSet::new();

        loop {
            let response = send_with_retry(&self.policy, "get denylist", || {
                let mut request = self.authed(self.client.get(&self.denylist_url));
                if let Some(cursor) = &cursor {
                    request = request.query(&[("cursor", cursor)]);
                }
                request
            })
            .await?;

            if !response.status().is_success() {
                return Err(Self::status_error("get denylist", response).await);
            }

            let bytes = response.bytes().await?;
            let page: DenylistPage = serde_json::from_slice(&bytes)?;
            tracing::debug!("Denylist page with {} entries", page.data.len());

            domains.extend(
                page.data
                    .iter()
                    .map(|entry| entry.id.trim().to_ascii_lowercase()),
            );

            match page.next_cursor() {
                Some(next) => {
                    // 重複的 cursor 代表分頁不會結束
                    if !seen_cursors.insert(next.to_string()) {
                        return Err(SyncError::ProcessingError {
                            message: format!("Denylist pagination repeated cursor {}", next),
                        });
                    }
                    cursor = Some(next.to_string());
                }
                None => break,
            }
        }

        Ok(domains)
    }

    /// Adds domains in chunks of `batch_size`. A rejected chunk is reported
    /// as one failure per domain and the remaining chunks are still sent.
    pub async fn add_domains(
        &self,
        domains: &BTreeSet<String>,
        batch_size: usize,
    ) -> (usize, Vec<DomainFailure>) {
        let mut added = 0;
        let mut failures = Vec::new();
        let domains: Vec<&String> = domains.iter().collect();

        for chunk in domains.chunks(batch_size.max(1)) {
            let payload: Vec<DenylistEntry> = chunk
                .iter()
                .map(|domain| DenylistEntry {
                    id: (*domain).clone(),
                    active: true,
                })
                .collect();

            let result = send_with_retry(&self.policy, "add domains", || {
                self.authed(self.client.post(&self.denylist_url)).json(&payload)
            })
            .await;

            let (status, message) = match result {
                Ok(response) if response.status().is_success() => {
                    added += chunk.len();
                    continue;
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    (Some(status), body)
                }
                Err(e) => (None, e.to_string()),
            };

            tracing::error!(
                "❌ Error adding {} domains: {} - {}",
                chunk.len(),
                status.map(|s| s.to_string()).unwrap_or_else(|| "transport".into()),
                message
            );
            failures.extend(chunk.iter().map(|domain| DomainFailure {
                domain: (*domain).clone(),
                operation: DomainOperation::Add,
                status,
                message: message.clone(),
            }));
        }

        if added > 0 {
            tracing::info!("✅ Successfully added {} domains", added);
        }
        (added, failures)
    }

    pub async fn remove_domain(&self, domain: &str) -> Result<()> {
        let url = format!("{}/{}", self.denylist_url, domain);
        let operation = format!("remove {}", domain);
        let response = send_with_retry(&self.policy, &operation, || {
            self.authed(self.client.delete(&url))
        })
        .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::status_error(&operation, response).await)
        }
    }

    /// Removes domains one by one, continuing past failures.
    pub async fn remove_domains(&self, domains: &BTreeSet<String>) -> (usize, Vec<DomainFailure>) {
        let mut removed = 0;
        let mut failures = Vec::new();

        for domain in domains {
            match self.remove_domain(domain).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::error!("❌ Error removing domain {}: {}", domain, e);
                    let status = match &e {
                        SyncError::ApiStatusError { status, .. } => Some(*status),
                        _ => None,
                    };
                    failures.push(DomainFailure {
                        domain: domain.clone(),
                        operation: DomainOperation::Remove,
                        status,
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Successfully processed {} domains for removal ({} removed)",
            domains.len(),
            removed
        );
        (removed, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_denylist_page_with_cursor() {
        let body = r#"{
            "data": [
                {"id": "ads.example.com", "active": true},
                {"id": "tracker.example.net", "active": false}
            ],
            "meta": {"pagination": {"cursor": "next-page"}}
        }"#;

        let page: DenylistPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.data.len(), 2);
        assert!(!page.data[1].active);
        assert_eq!(page.next_cursor(), Some("next-page"));
    }

    #[test]
    fn test_parse_last_page() {
        let body = r#"{"data": [], "meta": {"pagination": {"cursor": null}}}"#;
        let page: DenylistPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.next_cursor(), None);

        let page: DenylistPage = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert_eq!(page.next_cursor(), None);
    }

    #[test]
    fn test_legacy_domain_key() {
        let page: DenylistPage =
            serde_json::from_str(r#"{"data": [{"domain": "legacy.example.com"}]}"#).unwrap();
        assert_eq!(page.data[0].id, "legacy.example.com");
        assert!(page.data[0].active);
    }

    #[test]
    fn test_denylist_url_trims_trailing_slash() {
        let client = NextDnsClient::new(
            Client::new(),
            HttpPolicy::default(),
            "https://api.nextdns.io/",
            "abc123",
            "key",
        );
        assert_eq!(
            client.denylist_url(),
            "https://api.nextdns.io/profiles/abc123/denylist"
        );
    }

    #[test]
    fn test_add_payload_shape() {
        let entry = DenylistEntry {
            id: "ads.example.com".to_string(),
            active: true,
        };
        let json = serde_json::to_value(vec![entry]).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"id": "ads.example.com", "active": true}])
        );
    }
}
