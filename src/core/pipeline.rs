use crate::adapters::blocklist_source::BlocklistFetcher;
use crate::adapters::http::{build_client, HttpPolicy};
use crate::adapters::nextdns::NextDnsClient;
use crate::core::{ConfigProvider, Pipeline, Storage, SyncInput, SyncPlan, SyncReport};
use crate::domain::services;
use crate::utils::error::{Result, SyncError};
use chrono::Utc;

pub struct SyncPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    fetcher: BlocklistFetcher,
    nextdns: NextDnsClient,
}

impl<S: Storage, C: ConfigProvider> SyncPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let policy: HttpPolicy = config.http_policy();
        let client = build_client(&policy)?;

        let fetcher =
            BlocklistFetcher::new(client.clone(), policy.clone(), config.concurrent_downloads());
        let nextdns = NextDnsClient::new(
            client,
            policy,
            config.api_base_url(),
            config.profile_id(),
            config.api_key(),
        );

        Ok(Self {
            storage,
            config,
            fetcher,
            nextdns,
        })
    }

    fn empty_report(&self, plan: &SyncPlan) -> SyncReport {
        SyncReport {
            profile_id: self.config.profile_id().to_string(),
            finished_at: Utc::now(),
            dry_run: self.config.dry_run(),
            sources_ok: plan.sources_ok,
            sources_failed: plan.source_errors.len(),
            desired_count: plan.desired_count,
            current_count: plan.current_count,
            planned_additions: plan.to_add.len(),
            planned_removals: plan.to_remove.len(),
            added: 0,
            removed: 0,
            removals_suppressed: plan.removals_suppressed,
            source_errors: plan.source_errors.clone(),
            failures: Vec::new(),
        }
    }

    async fn write_report(&self, report: &SyncReport) -> Result<()> {
        if let Some(path) = self.config.report_path() {
            let json = serde_json::to_string_pretty(report)?;
            self.storage.write_file(path, json.as_bytes()).await?;
            tracing::info!("📁 Report saved to: {}", path);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for SyncPipeline<S, C> {
    async fn extract(&self) -> Result<SyncInput> {
        let raw = self.storage.read_file(self.config.sources_file()).await?;
        let text = String::from_utf8_lossy(&raw);
        let sources = services::parse_source_list(&text);

        if sources.is_empty() {
            return Err(SyncError::ConfigError {
                message: format!("No blocklist URLs found in {}", self.config.sources_file()),
            });
        }

        tracing::info!("Fetching {} remote blocklists...", sources.len());
        let fetched = self.fetcher.fetch_all(&sources).await;

        tracing::info!("Fetching current NextDNS denylist...");
        let current = self.nextdns.get_denylist().await?;
        tracing::info!("Found {} domains in your NextDNS denylist", current.len());

        Ok(SyncInput {
            sources: fetched,
            current,
        })
    }

    async fn transform(&self, input: SyncInput) -> Result<SyncPlan> {
        let source_errors = services::source_errors(&input.sources);
        let sources_ok = input.sources.len() - source_errors.len();

        // 全部來源失敗時，空集合會清空整個 denylist
        if sources_ok == 0 {
            return Err(SyncError::AllSourcesFailed {
                count: input.sources.len(),
            });
        }

        let merged = services::merge_sources(&input.sources);
        tracing::info!("Found {} unique domains in remote lists", merged.len());

        let desired = services::apply_allowlist(merged, self.config.allowlist());
        tracing::debug!("{} domains after allowlist", desired.len());

        let remove_stale = if source_errors.is_empty() {
            self.config.remove_stale()
        } else {
            tracing::warn!(
                "⚠️ {} of {} sources failed, skipping removals for this run",
                source_errors.len(),
                input.sources.len()
            );
            false
        };

        let mut plan = services::plan_sync(&desired, &input.current, remove_stale);
        plan.source_errors = source_errors;
        plan.sources_ok = sources_ok;

        tracing::info!(
            "Plan: {} to add, {} to remove",
            plan.to_add.len(),
            plan.to_remove.len()
        );
        if plan.removals_suppressed {
            tracing::info!("Stale domains kept on the profile");
        }

        Ok(plan)
    }

    async fn load(&self, plan: SyncPlan) -> Result<SyncReport> {
        let mut report = self.empty_report(&plan);

        if plan.is_empty() {
            tracing::info!("No changes to your denylist are needed");
        } else if self.config.dry_run() {
            tracing::info!("🔍 DRY RUN - no changes will be made");
            for domain in &plan.to_add {
                tracing::debug!("would add {}", domain);
            }
            for domain in &plan.to_remove {
                tracing::debug!("would remove {}", domain);
            }
        } else {
            if !plan.to_add.is_empty() {
                let (added, failures) = self
                    .nextdns
                    .add_domains(&plan.to_add, self.config.add_batch_size())
                    .await;
                report.added = added;
                report.failures.extend(failures);
            }

            if !plan.to_remove.is_empty() {
                let (removed, failures) = self.nextdns.remove_domains(&plan.to_remove).await;
                report.removed = removed;
                report.failures.extend(failures);
            }
        }

        report.finished_at = Utc::now();
        self.write_report(&report).await?;
        Ok(report)
    }
}
