use crate::adapters::http::{send_with_retry, HttpPolicy};
use crate::domain::model::{BlocklistSource, SourceFetch};
use crate::domain::services::parse_blocklist;
use futures::{stream, StreamExt};
use reqwest::Client;

/// Downloads blocklist sources with bounded concurrency.
#[derive(Clone)]
pub struct BlocklistFetcher {
    client: Client,
    policy: HttpPolicy,
    concurrent_downloads: usize,
}

impl BlocklistFetcher {
    pub fn new(client: Client, policy: HttpPolicy, concurrent_downloads: usize) -> Self {
        Self {
            client,
            policy,
            concurrent_downloads: concurrent_downloads.max(1),
        }
    }

    async fn fetch_one(&self, source: &BlocklistSource) -> SourceFetch {
        tracing::info!("📥 Fetching blocklist {}", source.url);

        let operation = format!("GET {}", source.url);
        let response =
            match send_with_retry(&self.policy, &operation, || self.client.get(&source.url)).await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!("❌ Error fetching {}: {}", source.url, e);
                    return SourceFetch::failed(&source.url, e.to_string());
                }
            };

        let status = response.status();
        if !status.is_success() {
            tracing::error!("❌ Error fetching {}: HTTP {}", source.url, status);
            return SourceFetch::failed(&source.url, format!("HTTP {}", status));
        }

        match response.text().await {
            Ok(body) => {
                let domains = parse_blocklist(&body);
                tracing::info!("Parsed {} domains from {}", domains.len(), source.url);
                SourceFetch::ok(&source.url, domains)
            }
            Err(e) => {
                tracing::error!("❌ Error reading body of {}: {}", source.url, e);
                SourceFetch::failed(&source.url, e.to_string())
            }
        }
    }

    /// Fetches every source; a failing source is recorded, never fatal.
    /// Results are ordered by URL.
    pub async fn fetch_all(&self, sources: &[BlocklistSource]) -> Vec<SourceFetch> {
        // 每個任務持有自己的來源與 fetcher，future 才能是 Send
        let tasks: Vec<_> = sources
            .to_vec()
            .into_iter()
            .map(|source| {
                let fetcher = self.clone();
                async move { fetcher.fetch_one(&source).await }
            })
            .collect();

        let mut results: Vec<SourceFetch> = stream::iter(tasks)
            .buffer_unordered(self.concurrent_downloads)
            .collect()
            .await;

        results.sort_by(|a, b| a.url.cmp(&b.url));
        results
    }
}
