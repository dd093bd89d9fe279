use clap::Parser;
use nextdns_blocklist::core::ConfigProvider;
use nextdns_blocklist::utils::error::SyncError;
use nextdns_blocklist::utils::{logger, validation::Validate};
use nextdns_blocklist::{CliConfig, LocalStorage, SyncEngine, SyncPipeline, SyncSettings};

fn fail(e: &SyncError) -> ! {
    tracing::error!(
        "❌ Sync failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    std::process::exit(e.exit_code());
}

fn display_summary(settings: &SyncSettings) {
    println!("📋 Configuration Summary:");
    println!("  Profile: {}", settings.profile_id());
    println!("  API: {}", settings.api_base_url());
    println!("  Sources file: {}", settings.sources_file());
    println!("  Allowlist entries: {}", settings.allowlist().len());
    println!("  Concurrent downloads: {}", settings.concurrent_downloads());
    println!("  Remove stale domains: {}", settings.remove_stale());
    if settings.dry_run() {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 日誌需在載入設定檔前初始化，設定檔中的 logging 區段只在此之後生效
    let settings = match cli.resolve() {
        Ok(settings) => settings,
        Err(e) => {
            logger::init_logger(cli.verbose, cli.json_logs);
            fail(&e);
        }
    };
    logger::init_logger(settings.verbose, settings.json_logs);

    tracing::info!("Starting nextdns-blocklist");
    if let Some(path) = &cli.config {
        tracing::info!("📁 Loaded configuration from: {}", path);
    }
    tracing::debug!("Resolved settings: {:?}", settings);

    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    display_summary(&settings);

    if settings.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let monitor_enabled = settings.monitor;
    let storage = LocalStorage::new(".");
    let pipeline = match SyncPipeline::new(storage, settings) {
        Ok(pipeline) => pipeline,
        Err(e) => fail(&e),
    };
    let engine = SyncEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(report) => {
            if report.has_failures() {
                // 部分網域處理失敗：下次排程會再試
                fail(&SyncError::PartialSyncError {
                    failed: report.failures.len(),
                });
            }
            println!("✅ Denylist sync completed successfully!");
            println!(
                "  Added: {}  Removed: {}  Desired: {}  Previously on profile: {}",
                report.added, report.removed, report.desired_count, report.current_count
            );
            if report.sources_failed > 0 {
                println!(
                    "  ⚠️ {} sources failed to download, stale domains were kept",
                    report.sources_failed
                );
            }
        }
        Err(e) => fail(&e),
    }

    Ok(())
}
