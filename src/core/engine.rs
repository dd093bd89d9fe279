use crate::core::{Pipeline, SyncReport};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct SyncEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> SyncEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<SyncReport> {
        tracing::info!("🚀 Starting denylist sync");
        self.monitor.log_stats("Start");

        // Extract
        let input = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} sources and {} current denylist entries",
            input.sources.len(),
            input.current.len()
        );
        self.monitor.log_stats("Extract");

        // Transform
        let plan = self.pipeline.transform(input).await?;
        self.monitor.log_stats("Transform");

        // Load
        let report = self.pipeline.load(plan).await?;
        tracing::info!(
            "Sync finished: {} added, {} removed, {} failures",
            report.added,
            report.removed,
            report.failures.len()
        );
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SyncInput, SyncPlan};
    use crate::domain::model::SourceFetch;
    use crate::domain::services;
    use crate::utils::error::SyncError;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubPipeline {
        load_calls: AtomicUsize,
        fail_extract: bool,
    }

    #[async_trait::async_trait]
    impl Pipeline for StubPipeline {
        async fn extract(&self) -> Result<SyncInput> {
            if self.fail_extract {
                return Err(SyncError::ProcessingError {
                    message: "boom".to_string(),
                });
            }
            let domains: BTreeSet<String> = ["a.com".to_string()].into_iter().collect();
            Ok(SyncInput {
                sources: vec![SourceFetch::ok("https://a", domains)],
                current: BTreeSet::new(),
            })
        }

        async fn transform(&self, input: SyncInput) -> Result<SyncPlan> {
            let desired = services::merge_sources(&input.sources);
            Ok(services::plan_sync(&desired, &input.current, true))
        }

        async fn load(&self, plan: SyncPlan) -> Result<SyncReport> {
            self.load_calls.fetch_add(1, Ordering::SeqCst);
            Ok(SyncReport {
                profile_id: "abc123".to_string(),
                finished_at: Utc::now(),
                dry_run: false,
                sources_ok: 1,
                sources_failed: 0,
                desired_count: plan.desired_count,
                current_count: plan.current_count,
                planned_additions: plan.to_add.len(),
                planned_removals: plan.to_remove.len(),
                added: plan.to_add.len(),
                removed: plan.to_remove.len(),
                removals_suppressed: false,
                source_errors: vec![],
                failures: vec![],
            })
        }
    }

    #[tokio::test]
    async fn test_engine_runs_all_phases() {
        let engine = SyncEngine::new(StubPipeline {
            load_calls: AtomicUsize::new(0),
            fail_extract: false,
        });

        let report = engine.run().await.unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(engine.pipeline.load_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_engine_stops_on_extract_error() {
        let engine = SyncEngine::new(StubPipeline {
            load_calls: AtomicUsize::new(0),
            fail_extract: true,
        });

        tokio_test::assert_err!(engine.run().await);
        assert_eq!(engine.pipeline.load_calls.load(Ordering::SeqCst), 0);
    }
}
