//! Poll Backend Example
//!
//! Simulates a task list view polling a slow backend. Shows the initial load,
//! timer-driven reloads, adaptive stretching when the backend gets slow, the
//! inactive cadence while hidden, and manual reloads through a handle.
//!
//! Run with: `GSA_LOG_MODE=development GSA_LOG_LEVEL=gsa_reload=debug cargo run -p gsa-sdk-reload --example poll_backend`

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gsa_reload::logging::init_logging_from_env;
use gsa_reload::{active_while, LoadError, ReloadController, ReloadSettings, SharedSettings};
use tokio::time::sleep;

/// Fake backend: every call takes `latency_ms` and bumps a counter
#[derive(Clone, Default)]
struct Backend {
    latency_ms: Arc<AtomicU64>,
    calls: Arc<AtomicUsize>,
    running_tasks: Arc<AtomicUsize>,
}

impl Backend {
    async fn get_tasks(&self, filter: Option<String>) -> Result<usize, LoadError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        sleep(Duration::from_millis(self.latency_ms.load(Ordering::SeqCst))).await;

        println!(
            "  📡 get_tasks #{} (filter: {})",
            call,
            filter.as_deref().unwrap_or("<none>")
        );

        if filter.as_deref() == Some("broken") {
            return Err(LoadError::msg("Invalid filter"));
        }
        Ok(self.running_tasks.load(Ordering::SeqCst))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;

    println!("🔁 GSA Reload Controller Example");
    println!("================================\n");

    let settings = SharedSettings::new(ReloadSettings {
        reload_interval: Duration::from_millis(500),
        reload_interval_active: Duration::from_millis(200),
        reload_interval_inactive: Duration::from_millis(2_000),
    });

    let backend = Backend::default();
    backend.running_tasks.store(2, Ordering::SeqCst);

    let running = Arc::clone(&backend.running_tasks);
    let loader = backend.clone();
    let controller = ReloadController::<String>::builder("tasks")
        .reload(move |filter| {
            let backend = loader.clone();
            async move { backend.get_tasks(filter).await.map(|_| ()) }
        })
        .interval_selector(active_while(move || running.load(Ordering::SeqCst) > 0))
        .settings(settings.clone())
        .build()?;

    println!("🚀 Starting (tasks running, active cadence)");
    controller.start().await;
    sleep(Duration::from_millis(700)).await;
    println!("{}", controller.stats());

    println!("✅ Tasks finished, back to the normal cadence");
    backend.running_tasks.store(0, Ordering::SeqCst);
    sleep(Duration::from_millis(1_200)).await;
    println!("{}", controller.stats());

    println!("🐢 Backend got slow, intervals stretch");
    backend.latency_ms.store(800, Ordering::SeqCst);
    sleep(Duration::from_millis(3_000)).await;
    println!("{}", controller.stats());
    backend.latency_ms.store(0, Ordering::SeqCst);

    println!("🙈 View hidden, inactive cadence");
    controller.set_visible(false);
    sleep(Duration::from_millis(2_500)).await;
    println!("{}", controller.stats());
    controller.set_visible(true);

    let handle = controller.handle();

    println!("🔍 Manual reload with a filter");
    handle.reload(Some("status=Running".to_string())).await;

    println!("💥 Manual reload with a broken filter stops polling");
    handle.reload(Some("broken".to_string())).await;
    println!("  Timer pending: {}", controller.has_timer());

    println!("🔁 Manual reload resumes polling");
    handle.reload(None).await;
    println!("  Timer pending: {}", controller.has_timer());

    println!("⏹️  Stopping");
    controller.stop();
    handle.reload(None).await;
    println!("{}", controller.stats());
    println!("  Backend calls: {}", backend.calls.load(Ordering::SeqCst));

    Ok(())
}
