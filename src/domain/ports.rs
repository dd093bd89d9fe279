use crate::adapters::http::HttpPolicy;
use crate::domain::model::{SyncInput, SyncPlan, SyncReport};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn api_key(&self) -> &str;
    fn profile_id(&self) -> &str;
    fn api_base_url(&self) -> &str;
    fn sources_file(&self) -> &str;
    fn allowlist(&self) -> &[String];
    fn concurrent_downloads(&self) -> usize;
    fn http_policy(&self) -> HttpPolicy;
    fn add_batch_size(&self) -> usize;
    fn remove_stale(&self) -> bool;
    fn dry_run(&self) -> bool;
    fn report_path(&self) -> Option<&str>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<SyncInput>;
    async fn transform(&self, input: SyncInput) -> Result<SyncPlan>;
    async fn load(&self, plan: SyncPlan) -> Result<SyncReport>;
}
