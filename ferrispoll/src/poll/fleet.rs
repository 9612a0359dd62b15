//! Fleet Poller.
//!
//! One orchestrator task per device on a [`JoinSet`], with a [`Semaphore`]
//! capping how many sessions are open at once. Tasks share nothing but the
//! connector, the sink and read-only family definitions, so one device's
//! failure never touches another's session.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::device;
use super::result::{CycleReport, PollResult};
use crate::config::PollerConfig;
use crate::error::{ConfigError, ErrorKind, Result};
use crate::inventory::{DeviceTarget, Inventory};
use crate::platform::CommandCatalog;
use crate::session::SessionState;
use crate::sink::ReadingSink;
use crate::transport::{Connector, SshConnector};

/// Polls every device of an inventory with bounded concurrency.
pub struct FleetPoller<C, K> {
    connector: Arc<C>,
    catalog: Arc<dyn CommandCatalog>,
    sink: Arc<K>,
    config: PollerConfig,
}

impl<K> FleetPoller<SshConnector, K>
where
    K: ReadingSink + 'static,
{
    /// Poller that connects over SSH using the config's settings.
    pub fn over_ssh(
        catalog: impl CommandCatalog + 'static,
        sink: Arc<K>,
        config: PollerConfig,
    ) -> Self {
        let connector = SshConnector::new(config.ssh.clone());
        Self::new(connector, catalog, sink, config)
    }
}

impl<C, K> FleetPoller<C, K>
where
    C: Connector + 'static,
    C::Shell: 'static,
    K: ReadingSink + 'static,
{
    pub fn new(
        connector: C,
        catalog: impl CommandCatalog + 'static,
        sink: Arc<K>,
        config: PollerConfig,
    ) -> Self {
        Self {
            connector: Arc::new(connector),
            catalog: Arc::new(catalog),
            sink,
            config,
        }
    }

    /// Get the sink.
    pub fn sink(&self) -> &Arc<K> {
        &self.sink
    }

    /// Get the configuration.
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Poll every active device once.
    pub async fn poll_cycle<I: Inventory>(&self, inventory: &I) -> Result<CycleReport> {
        self.poll_until(inventory, std::future::pending()).await
    }

    /// Poll every active device once, stopping early when `shutdown`
    /// resolves. Devices still in flight at that point are aborted and left
    /// out of the report.
    pub async fn poll_until<I: Inventory>(
        &self,
        inventory: &I,
        shutdown: impl Future<Output = ()>,
    ) -> Result<CycleReport> {
        let targets = inventory.targets().await?;
        Ok(self.poll_targets(targets, shutdown).await)
    }

    /// Poll one device by inventory id.
    pub async fn poll_device<I: Inventory>(&self, inventory: &I, id: &str) -> Result<PollResult> {
        let target = inventory
            .target(id)
            .await?
            .ok_or_else(|| ConfigError::Inventory {
                message: format!("no active device with id '{}'", id),
            })?;

        let report = self.poll_targets(vec![target], std::future::pending()).await;
        report.results.into_iter().next().ok_or_else(|| {
            ConfigError::Inventory {
                message: format!("device '{}' produced no result", id),
            }
            .into()
        })
    }

    /// Poll the given devices.
    pub async fn poll_targets(
        &self,
        targets: Vec<DeviceTarget>,
        shutdown: impl Future<Output = ()>,
    ) -> CycleReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        info!(
            "poll cycle: {} devices, concurrency {}",
            targets.len(),
            self.config.concurrency
        );

        let mut results = Vec::with_capacity(targets.len());
        let mut pending: HashMap<String, String> = HashMap::new();
        let mut tasks = JoinSet::new();

        for target in targets {
            let family = match self.catalog.family(&target.device.family) {
                Ok(family) => family,
                Err(e) => {
                    warn!("{}: {}", target.device.hostname, e);
                    results.push(PollResult::failed(
                        &target.device.id,
                        &target.device.hostname,
                        e.kind(),
                        SessionState::Disconnected,
                        e.to_string(),
                        start.elapsed(),
                    ));
                    continue;
                }
            };

            pending.insert(target.device.id.clone(), target.device.hostname.clone());
            let connector = self.connector.clone();
            let sink = self.sink.clone();
            let semaphore = semaphore.clone();
            let budget = self.config.device_deadline;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                device::poll_device(&*connector, &family, &target, &*sink, budget).await
            });
        }

        let mut stopping = false;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(result)) => {
                        pending.remove(&result.device_id);
                        results.push(result);
                    }
                    Some(Err(e)) if e.is_cancelled() => {}
                    Some(Err(e)) => error!("device task failed: {}", e),
                    None => break,
                },
                _ = &mut shutdown, if !stopping => {
                    warn!("stop requested, aborting {} in-flight devices", tasks.len());
                    stopping = true;
                    tasks.abort_all();
                }
            }
        }

        let mut cancelled = 0;
        for (id, hostname) in pending {
            if stopping {
                cancelled += 1;
            } else {
                results.push(PollResult::failed(
                    id,
                    hostname,
                    ErrorKind::ProtocolError,
                    SessionState::Failed,
                    "poll task terminated unexpectedly",
                    start.elapsed(),
                ));
            }
        }

        let report = CycleReport {
            started_at,
            duration: start.elapsed(),
            results,
            cancelled,
        };
        info!(
            "poll cycle done in {:?}: {} ok, {} partial, {} failed, {} cancelled",
            report.duration,
            report.succeeded(),
            report.partial(),
            report.failed(),
            report.cancelled
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::channel::SettleTime;
    use crate::inventory::StaticInventory;
    use crate::platform::vendors::tejas;
    use crate::platform::{DeviceFamily, FamilyRegistry};
    use crate::poll::DeviceOutcome;
    use crate::poll::device::tests::{target, tejas_script};
    use crate::sink::MemorySink;
    use crate::transport::mock::{Behavior, MockConnector};

    fn registry() -> FamilyRegistry {
        let fast =
            SettleTime::new(Duration::from_millis(300)).with_quiet(Duration::from_millis(30));
        let mut family: DeviceFamily = tejas::family().with_login_settle(fast, fast);
        for command in &mut family.commands {
            command.settle = fast;
        }
        let mut registry = FamilyRegistry::new();
        registry.register(family).unwrap();
        registry
    }

    fn poller(
        connector: MockConnector,
        concurrency: usize,
    ) -> FleetPoller<MockConnector, MemorySink> {
        let config = PollerConfig::builder()
            .concurrency(concurrency)
            .device_deadline(Duration::from_secs(5))
            .build();
        FleetPoller::new(connector, registry(), Arc::new(MemorySink::new()), config)
    }

    #[tokio::test]
    async fn test_unreachable_device_does_not_affect_others() {
        let _ = env_logger::builder().is_test(true).try_init();
        let connector = MockConnector::new()
            .host("10.0.0.1", Behavior::Device(tejas_script()))
            .host("10.0.0.2", Behavior::Device(tejas_script()))
            .host("10.0.0.3", Behavior::Device(tejas_script()))
            .host("10.0.0.9", Behavior::Unreachable(Duration::from_millis(200)));
        let inventory = StaticInventory::new(vec![
            target("r1", "10.0.0.1"),
            target("r2", "10.0.0.2"),
            target("r9", "10.0.0.9"),
            target("r3", "10.0.0.3"),
        ]);

        let poller = poller(connector, 5);
        let report = poller.poll_cycle(&inventory).await.unwrap();

        assert_eq!(report.results.len(), 4);
        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.failed(), 1);
        let failed = report.device("r9").unwrap();
        assert_eq!(failed.failure.as_ref().unwrap().reason, ErrorKind::ConnectionError);
        assert!(failed.commands.is_empty());
        assert_eq!(poller.sink().readings().len(), 12);
    }

    #[tokio::test]
    async fn test_concurrency_ceiling_is_respected() {
        let connector = MockConnector::new()
            .host("10.0.0.1", Behavior::Unreachable(Duration::from_millis(200)))
            .host("10.0.0.2", Behavior::Unreachable(Duration::from_millis(200)))
            .host("10.0.0.3", Behavior::Unreachable(Duration::from_millis(200)));
        let inventory = StaticInventory::new(vec![
            target("r1", "10.0.0.1"),
            target("r2", "10.0.0.2"),
            target("r3", "10.0.0.3"),
        ]);

        let started = Instant::now();
        let report = poller(connector, 1).poll_cycle(&inventory).await.unwrap();

        assert_eq!(report.failed(), 3);
        assert!(started.elapsed() >= Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_unknown_family_is_configuration_failure() {
        let mut stray = target("r1", "10.0.0.1");
        stray.device.family = "unknown".into();
        let connector = MockConnector::new().host("10.0.0.1", Behavior::Device(tejas_script()));

        let report = poller(connector, 5)
            .poll_cycle(&StaticInventory::new(vec![stray]))
            .await
            .unwrap();
        let result = report.device("r1").unwrap();
        assert_eq!(result.outcome, DeviceOutcome::Failed);
        assert_eq!(
            result.failure.as_ref().unwrap().reason,
            ErrorKind::ConfigurationError
        );
    }

    #[tokio::test]
    async fn test_poll_single_device() {
        let connector = MockConnector::new()
            .host("10.0.0.1", Behavior::Device(tejas_script()))
            .host("10.0.0.2", Behavior::Device(tejas_script()));
        let inventory =
            StaticInventory::new(vec![target("r1", "10.0.0.1"), target("r2", "10.0.0.2")]);
        let poller = poller(connector.clone(), 5);

        let result = poller.poll_device(&inventory, "r2").await.unwrap();
        assert_eq!(result.device_id, "r2");
        assert_eq!(result.outcome, DeviceOutcome::Success);
        assert!(connector.sent("10.0.0.1").is_empty());

        assert!(poller.poll_device(&inventory, "r7").await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_aborts_in_flight_devices() {
        let connector = MockConnector::new()
            .host("10.0.0.1", Behavior::Device(tejas_script()))
            .host("10.0.0.9", Behavior::Unreachable(Duration::from_secs(30)));
        let inventory =
            StaticInventory::new(vec![target("r1", "10.0.0.1"), target("r9", "10.0.0.9")]);

        let started = Instant::now();
        let report = poller(connector, 5)
            .poll_until(&inventory, tokio::time::sleep(Duration::from_secs(2)))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(report.cancelled, 1);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].device_id, "r1");
        assert_eq!(report.to_document()["success"], false);
    }
}
