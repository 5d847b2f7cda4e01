//! DiscoveryEngine: runs the discovery strategies of one session.
//!
//! A session is created by [`DiscoveryEngine::start`] and destroyed by
//! [`DiscoveryEngine::stop`].  Each timed strategy is one tokio task driven by
//! its own interval; the advertisement is a published mDNS record with no
//! timer at all.
//!
//! ```text
//! start(config)
//!  ├─ DirectProbe   every 1 s  ──► target:udp_target_port        (until stop)
//!  └─ otherwise, per flag:
//!       ├─ Broadcast   every send_frequency_ms ──► 255.255.255.255 (max 30 sends)
//!       ├─ Advertisement  publish service record                   (until stop)
//!       └─ SubnetSweep every 1 s ──► every host of the local subnet (until stop)
//! ```
//!
//! # Cancellation
//!
//! `stop()` clears the session's `running` flag and aborts every strategy task.
//! A send already in flight may complete, but no new send is scheduled
//! afterwards.  Strategies check the flag before every send, so a sweep cycle
//! in progress ends at the next address.  `stop()` only touches atomics and
//! `JoinHandle::abort`, so it is safe to call from any thread, any number of
//! times, before or after `start()`.
//!
//! The outbound socket is left open across sessions.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc, Mutex, PoisonError,
};
use std::time::Duration;

use finder_core::{
    protocol::{
        defaults::{MAX_BROADCAST_ATTEMPTS, PROBE_INTERVAL},
        DISCOVERY_PROBE,
    },
    DiscoveryConfig, DiscoveryPlan, Strategy, SubnetRange,
};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::advertise::{ServiceAdvertiser, ServiceRecord};
use super::outbound::DatagramSink;
use crate::application::pairing::DiscoveryControl;
use crate::infrastructure::interfaces::AddressOracle;

/// Error type for discovery engine operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// `start` was called outside a tokio runtime.
    #[error("discovery must be started from within a tokio runtime")]
    NoRuntime,
}

/// Timer settings shared by every session of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTiming {
    /// Tick period of the subnet sweep and the direct probe.
    pub probe_interval: Duration,
    /// Broadcast safety cap per session.
    pub max_broadcast_attempts: u32,
    /// Largest subnet the sweep will probe, in hosts.  `None` sweeps any size.
    pub max_sweep_hosts: Option<usize>,
}

impl Default for EngineTiming {
    fn default() -> Self {
        Self {
            probe_interval: PROBE_INTERVAL,
            max_broadcast_attempts: MAX_BROADCAST_ATTEMPTS,
            max_sweep_hosts: None,
        }
    }
}

/// Sends per strategy in the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub broadcast: u32,
    pub sweep: u32,
    pub direct: u32,
    /// Whether the service record is currently published.
    pub advertising: bool,
}

#[derive(Debug, Default)]
struct SendCounters {
    broadcast: AtomicU32,
    sweep: AtomicU32,
    direct: AtomicU32,
}

impl SendCounters {
    fn for_strategy(&self, strategy: Strategy) -> Option<&AtomicU32> {
        match strategy {
            Strategy::Broadcast => Some(&self.broadcast),
            Strategy::SubnetSweep => Some(&self.sweep),
            Strategy::DirectProbe => Some(&self.direct),
            Strategy::Advertisement => None,
        }
    }
}

/// Ephemeral state of one discovery run.
struct DiscoverySession {
    id: Uuid,
    running: Arc<AtomicBool>,
    counters: Arc<SendCounters>,
    tasks: Vec<(Strategy, JoinHandle<()>)>,
    advertised: bool,
}

impl DiscoverySession {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            running: Arc::new(AtomicBool::new(true)),
            counters: Arc::new(SendCounters::default()),
            tasks: Vec::new(),
            advertised: false,
        }
    }

    fn stats(&self) -> SessionStats {
        SessionStats {
            broadcast: self.counters.broadcast.load(Ordering::Relaxed),
            sweep: self.counters.sweep.load(Ordering::Relaxed),
            direct: self.counters.direct.load(Ordering::Relaxed),
            advertising: self.advertised,
        }
    }
}

/// Everything a strategy task needs, cloned into the task.
#[derive(Clone)]
struct StrategyContext {
    sink: Arc<dyn DatagramSink>,
    running: Arc<AtomicBool>,
    counters: Arc<SendCounters>,
    target_port: u16,
}

impl StrategyContext {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Sends one discovery probe.  Failures are logged, never propagated.
    async fn probe(&self, strategy: Strategy, ip: Ipv4Addr) {
        let target = SocketAddrV4::new(ip, self.target_port);
        if let Some(counter) = self.counters.for_strategy(strategy) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        match self.sink.send_to(DISCOVERY_PROBE, target).await {
            Ok(_) => {}
            // A sweep hits many absent hosts; keep those at debug.
            Err(e) if strategy == Strategy::SubnetSweep => {
                debug!("{strategy} probe to {target} failed: {e}")
            }
            Err(e) => warn!("{strategy} probe to {target} failed: {e}"),
        }
    }
}

/// Orchestrates the discovery strategies and owns their timers.
pub struct DiscoveryEngine {
    sink: Arc<dyn DatagramSink>,
    oracle: Arc<dyn AddressOracle>,
    advertiser: Arc<dyn ServiceAdvertiser>,
    record: ServiceRecord,
    timing: EngineTiming,
    session: Mutex<Option<DiscoverySession>>,
}

impl DiscoveryEngine {
    pub fn new(
        sink: Arc<dyn DatagramSink>,
        oracle: Arc<dyn AddressOracle>,
        advertiser: Arc<dyn ServiceAdvertiser>,
    ) -> Self {
        Self {
            sink,
            oracle,
            advertiser,
            record: ServiceRecord::default(),
            timing: EngineTiming::default(),
            session: Mutex::new(None),
        }
    }

    pub fn with_timing(mut self, timing: EngineTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Overrides the record published by the advertisement strategy.
    pub fn with_service_record(mut self, record: ServiceRecord) -> Self {
        self.record = record;
        self
    }

    /// Starts a discovery session for `config`.
    ///
    /// An already running session is stopped first, so a strategy never has
    /// more than one active timer.  A config with no method selected starts an
    /// empty session that sends nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::NoRuntime`] when called outside a tokio runtime.
    pub fn start(&self, config: &DiscoveryConfig) -> Result<(), DiscoveryError> {
        let handle = Handle::try_current().map_err(|_| DiscoveryError::NoRuntime)?;
        let mut guard = self.session.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = guard.take() {
            info!("restarting discovery; ending session {}", previous.id);
            self.end_session(previous);
        }

        let mut session = DiscoverySession::new();
        let span = info_span!("discovery", session = %session.id);
        let ctx = StrategyContext {
            sink: Arc::clone(&self.sink),
            running: Arc::clone(&session.running),
            counters: Arc::clone(&session.counters),
            target_port: config.udp_target_port,
        };

        let plan = config.plan();
        info!(parent: &span, "starting discovery: {:?}", plan.strategies());
        if plan.is_empty() {
            info!(parent: &span, "no discovery method selected; nothing will be sent");
        }

        match plan {
            DiscoveryPlan::Direct(target) => {
                let task = run_direct_probe(ctx, target, self.timing.probe_interval);
                session.tasks.push((
                    Strategy::DirectProbe,
                    handle.spawn(task.instrument(span.clone())),
                ));
            }
            DiscoveryPlan::Strategies {
                broadcast,
                advertisement,
                sweep,
            } => {
                if broadcast {
                    let task = run_broadcast(
                        ctx.clone(),
                        config.broadcast_period(),
                        self.timing.max_broadcast_attempts,
                    );
                    session.tasks.push((
                        Strategy::Broadcast,
                        handle.spawn(task.instrument(span.clone())),
                    ));
                }
                if advertisement {
                    match self.advertiser.publish(&self.record) {
                        Ok(()) => session.advertised = true,
                        Err(e) => warn!(parent: &span, "service advertisement unavailable: {e}"),
                    }
                }
                if sweep {
                    if let Some(range) = self.resolve_sweep_range() {
                        info!(
                            parent: &span,
                            "sweeping {} hosts of {}/{}",
                            range.host_count(),
                            range.network(),
                            range.prefix_len()
                        );
                        let task = run_subnet_sweep(ctx, range, self.timing.probe_interval);
                        session.tasks.push((
                            Strategy::SubnetSweep,
                            handle.spawn(task.instrument(span.clone())),
                        ));
                    }
                }
            }
        }

        *guard = Some(session);
        Ok(())
    }

    /// Halts every strategy of the current session.  Idempotent.
    pub fn stop(&self) {
        let session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match session {
            Some(session) => self.end_session(session),
            None => debug!("stop requested with no active discovery session"),
        }
    }

    /// Returns `true` while a session exists (between `start` and `stop`).
    pub fn is_running(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Send counters of the current session, if any.
    pub fn stats(&self) -> Option<SessionStats> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(DiscoverySession::stats)
    }

    fn end_session(&self, session: DiscoverySession) {
        session.running.store(false, Ordering::Release);
        for (strategy, task) in &session.tasks {
            task.abort();
            debug!("aborted {strategy} timer of session {}", session.id);
        }
        if session.advertised {
            self.advertiser.withdraw();
        }
        let stats = session.stats();
        info!(
            "discovery session {} stopped (broadcast={}, sweep={}, direct={})",
            session.id, stats.broadcast, stats.sweep, stats.direct
        );
    }

    /// Local subnet for the sweep, or `None` when the sweep is unavailable
    /// this run.
    fn resolve_sweep_range(&self) -> Option<SubnetRange> {
        let local = match self.oracle.local_address_and_mask() {
            Ok(local) => local,
            Err(e) => {
                warn!("subnet sweep unavailable this run: {e}");
                return None;
            }
        };
        match SubnetRange::new(local.ip, local.netmask) {
            Ok(range) => match self.timing.max_sweep_hosts {
                Some(cap) if range.host_count() > cap => {
                    warn!(
                        "subnet sweep unavailable this run: /{} has {} hosts, cap is {cap}",
                        range.prefix_len(),
                        range.host_count()
                    );
                    None
                }
                _ => Some(range),
            },
            Err(e) => {
                warn!(
                    "subnet sweep unavailable this run ({} / {}): {e}",
                    local.ip, local.netmask
                );
                None
            }
        }
    }
}

impl DiscoveryControl for DiscoveryEngine {
    fn stop(&self) {
        DiscoveryEngine::stop(self);
    }
}

impl Drop for DiscoveryEngine {
    fn drop(&mut self) {
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(session) = session {
            self.end_session(session);
        }
    }
}

// ── Strategy tasks ────────────────────────────────────────────────────────────

/// Fires one period after start, then every period.  A late tick pushes the
/// following ones back instead of bursting.
fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn run_broadcast(ctx: StrategyContext, period: Duration, max_attempts: u32) {
    if max_attempts == 0 {
        return;
    }
    let mut ticker = ticker(period);
    let mut attempts = 0u32;
    loop {
        ticker.tick().await;
        if !ctx.is_running() {
            break;
        }
        ctx.probe(Strategy::Broadcast, Ipv4Addr::BROADCAST).await;
        attempts += 1;
        if attempts >= max_attempts {
            info!("broadcast stopped after {attempts} attempts");
            break;
        }
    }
}

async fn run_subnet_sweep(ctx: StrategyContext, range: SubnetRange, period: Duration) {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        let mut sent = 0usize;
        for host in range.hosts() {
            if !ctx.is_running() {
                return;
            }
            ctx.probe(Strategy::SubnetSweep, host).await;
            sent += 1;
        }
        debug!("sweep cycle complete: {sent} probes");
    }
}

async fn run_direct_probe(ctx: StrategyContext, target: Ipv4Addr, period: Duration) {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        if !ctx.is_running() {
            break;
        }
        ctx.probe(Strategy::DirectProbe, target).await;
        debug!("sent discovery probe to {target}:{}", ctx.target_port);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::interfaces::mock::StaticAddressOracle;
    use crate::infrastructure::network::advertise::mock::RecordingAdvertiser;
    use crate::infrastructure::network::outbound::mock::RecordingSink;
    use std::collections::HashSet;
    use tokio::time::sleep;

    struct Fixture {
        sink: Arc<RecordingSink>,
        advertiser: Arc<RecordingAdvertiser>,
        engine: DiscoveryEngine,
    }

    fn fixture_with(sink: RecordingSink, oracle: StaticAddressOracle) -> Fixture {
        let sink = Arc::new(sink);
        let advertiser = Arc::new(RecordingAdvertiser::new());
        let engine = DiscoveryEngine::new(
            Arc::clone(&sink) as Arc<dyn DatagramSink>,
            Arc::new(oracle),
            Arc::clone(&advertiser) as Arc<dyn ServiceAdvertiser>,
        );
        Fixture {
            sink,
            advertiser,
            engine,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(
            RecordingSink::new(),
            StaticAddressOracle::new(
                Ipv4Addr::new(192, 168, 1, 10),
                Ipv4Addr::new(255, 255, 255, 0),
            ),
        )
    }

    fn direct_config(target: Ipv4Addr) -> DiscoveryConfig {
        DiscoveryConfig {
            direct_target: Some(target),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_stops_itself_after_thirty_sends() {
        // Arrange
        let f = fixture();
        let cfg = DiscoveryConfig {
            use_broadcast: true,
            ..Default::default()
        };

        // Act
        f.engine.start(&cfg).unwrap();
        sleep(Duration::from_secs(45)).await;

        // Assert
        assert_eq!(f.sink.count(), 30);
        assert!(f.sink.sent().iter().all(|d| {
            d.payload == DISCOVERY_PROBE
                && d.target == SocketAddrV4::new(Ipv4Addr::BROADCAST, 9910)
        }));
        assert_eq!(f.engine.stats().unwrap().broadcast, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_period_follows_send_frequency() {
        let f = fixture();
        let cfg = DiscoveryConfig {
            use_broadcast: true,
            send_frequency_ms: 250,
            ..Default::default()
        };

        f.engine.start(&cfg).unwrap();
        sleep(Duration::from_millis(1_100)).await;

        assert_eq!(f.sink.count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_send_happens_one_period_after_start() {
        let f = fixture();
        f.engine.start(&direct_config(Ipv4Addr::new(10, 0, 0, 5))).unwrap();

        sleep(Duration::from_millis(900)).await;
        assert_eq!(f.sink.count(), 0);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(f.sink.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_target_suppresses_every_other_strategy() {
        // Arrange: all flags on, but a direct target is set
        let f = fixture();
        let target = Ipv4Addr::new(192, 168, 1, 77);
        let cfg = DiscoveryConfig {
            use_broadcast: true,
            use_advertisement: true,
            use_sweep: true,
            ..direct_config(target)
        };

        // Act
        f.engine.start(&cfg).unwrap();
        sleep(Duration::from_millis(5_500)).await;

        // Assert: five probes, all to the target, no advertisement
        assert_eq!(f.sink.count(), 5);
        assert_eq!(f.sink.count_to(target), 5);
        assert!(f.advertiser.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_covers_local_subnet_except_self() {
        // Arrange
        let f = fixture();
        let cfg = DiscoveryConfig {
            use_sweep: true,
            ..Default::default()
        };

        // Act: one sweep cycle
        f.engine.start(&cfg).unwrap();
        sleep(Duration::from_millis(1_500)).await;

        // Assert
        let targets: HashSet<Ipv4Addr> = f.sink.sent().iter().map(|d| *d.target.ip()).collect();
        let expected: HashSet<Ipv4Addr> = (1u8..=254)
            .filter(|last| *last != 10)
            .map(|last| Ipv4Addr::new(192, 168, 1, last))
            .collect();
        assert_eq!(f.sink.count(), 253);
        assert_eq!(targets, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_repeats_every_tick() {
        let f = fixture();
        let cfg = DiscoveryConfig {
            use_sweep: true,
            ..Default::default()
        };

        f.engine.start(&cfg).unwrap();
        sleep(Duration::from_millis(2_500)).await;

        assert_eq!(f.sink.count(), 2 * 253);
        assert_eq!(f.sink.count_to(Ipv4Addr::new(192, 168, 1, 1)), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_accepts_subnets_wider_than_slash_16() {
        // Arrange: a /15 LAN
        let f = fixture_with(
            RecordingSink::new(),
            StaticAddressOracle::new(Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(255, 254, 0, 0)),
        );
        let cfg = DiscoveryConfig {
            use_sweep: true,
            ..Default::default()
        };

        // Act: one sweep cycle
        f.engine.start(&cfg).unwrap();
        sleep(Duration::from_millis(1_500)).await;
        f.engine.stop();

        // Assert
        assert_eq!(f.sink.count(), (1 << 17) - 3);
        assert_eq!(f.sink.count_to(Ipv4Addr::new(10, 1, 255, 254)), 1);
        assert_eq!(f.sink.count_to(Ipv4Addr::new(10, 0, 0, 5)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_host_cap_skips_oversized_subnet() {
        let sink = Arc::new(RecordingSink::new());
        let engine = DiscoveryEngine::new(
            Arc::clone(&sink) as Arc<dyn DatagramSink>,
            Arc::new(StaticAddressOracle::new(
                Ipv4Addr::new(192, 168, 1, 10),
                Ipv4Addr::new(255, 255, 255, 0),
            )),
            Arc::new(RecordingAdvertiser::new()),
        )
        .with_timing(EngineTiming {
            max_sweep_hosts: Some(100),
            ..EngineTiming::default()
        });
        let cfg = DiscoveryConfig {
            use_broadcast: true,
            use_sweep: true,
            ..Default::default()
        };

        engine.start(&cfg).unwrap();
        sleep(Duration::from_millis(1_500)).await;

        // Only the broadcast went out.
        assert_eq!(sink.count(), 1);
        assert_eq!(engine.stats().unwrap().sweep, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_local_address_only_disables_sweep() {
        // Arrange
        let f = fixture_with(RecordingSink::new(), StaticAddressOracle::not_found());
        let cfg = DiscoveryConfig {
            use_broadcast: true,
            use_advertisement: true,
            use_sweep: true,
            ..Default::default()
        };

        // Act
        f.engine.start(&cfg).unwrap();
        sleep(Duration::from_millis(3_500)).await;

        // Assert: broadcast and advertisement unaffected
        assert_eq!(f.sink.count(), 3);
        assert_eq!(f.sink.count_to(Ipv4Addr::BROADCAST), 3);
        assert!(f.advertiser.is_active());
        assert_eq!(f.engine.stats().unwrap().sweep, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_sends_and_is_idempotent() {
        // Arrange
        let f = fixture();
        f.engine.start(&direct_config(Ipv4Addr::new(10, 0, 0, 5))).unwrap();
        sleep(Duration::from_millis(3_500)).await;
        assert_eq!(f.sink.count(), 3);

        // Act
        f.engine.stop();
        f.engine.stop();
        sleep(Duration::from_secs(10)).await;

        // Assert
        assert_eq!(f.sink.count(), 3);
        assert!(!f.engine.is_running());
        assert!(f.engine.stats().is_none());
    }

    #[tokio::test]
    async fn test_stop_before_start_is_safe() {
        let f = fixture();
        f.engine.stop();
        assert!(!f.engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_sweep_schedules_no_new_cycle() {
        let f = fixture();
        let cfg = DiscoveryConfig {
            use_sweep: true,
            ..Default::default()
        };
        f.engine.start(&cfg).unwrap();
        sleep(Duration::from_millis(1_500)).await;

        f.engine.stop();
        sleep(Duration::from_secs(5)).await;

        assert_eq!(f.sink.count(), 253);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_never_duplicates_timers() {
        // Arrange
        let f = fixture();
        let cfg = direct_config(Ipv4Addr::new(10, 0, 0, 5));

        // Act: start twice without stopping
        f.engine.start(&cfg).unwrap();
        f.engine.start(&cfg).unwrap();
        sleep(Duration::from_millis(2_500)).await;

        // Assert: one timer, so two ticks means two sends
        assert_eq!(f.sink.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_broadcast_cap() {
        let sink = Arc::new(RecordingSink::new());
        let engine = DiscoveryEngine::new(
            Arc::clone(&sink) as Arc<dyn DatagramSink>,
            Arc::new(StaticAddressOracle::not_found()),
            Arc::new(RecordingAdvertiser::new()),
        )
        .with_timing(EngineTiming {
            max_broadcast_attempts: 2,
            ..EngineTiming::default()
        });
        let cfg = DiscoveryConfig {
            use_broadcast: true,
            ..Default::default()
        };

        engine.start(&cfg).unwrap();
        sleep(Duration::from_secs(5)).await;
        engine.start(&cfg).unwrap();
        sleep(Duration::from_secs(5)).await;

        assert_eq!(sink.count(), 4);
    }

    #[tokio::test]
    async fn test_advertisement_published_on_start_and_withdrawn_on_stop() {
        // Arrange
        let f = fixture();
        let cfg = DiscoveryConfig {
            use_advertisement: true,
            ..Default::default()
        };

        // Act
        f.engine.start(&cfg).unwrap();
        let published = f.advertiser.published();
        let advertising = f.engine.stats().unwrap().advertising;
        f.engine.stop();

        // Assert
        assert_eq!(published, vec![ServiceRecord::default()]);
        assert!(advertising);
        assert!(!f.advertiser.is_active());
        assert_eq!(f.advertiser.withdrawn(), 1);
        assert_eq!(f.sink.count(), 0);
    }

    #[tokio::test]
    async fn test_failed_advertisement_does_not_abort_session() {
        let sink = Arc::new(RecordingSink::new());
        let engine = DiscoveryEngine::new(
            Arc::clone(&sink) as Arc<dyn DatagramSink>,
            Arc::new(StaticAddressOracle::not_found()),
            Arc::new(RecordingAdvertiser::failing()),
        );
        let cfg = DiscoveryConfig {
            use_advertisement: true,
            ..Default::default()
        };

        assert!(engine.start(&cfg).is_ok());
        assert!(engine.is_running());
        assert!(!engine.stats().unwrap().advertising);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failures_do_not_stop_direct_probe() {
        let f = fixture_with(
            RecordingSink::failing(),
            StaticAddressOracle::not_found(),
        );

        f.engine.start(&direct_config(Ipv4Addr::new(10, 0, 0, 5))).unwrap();
        sleep(Duration::from_millis(3_500)).await;

        assert_eq!(f.sink.count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_plan_sends_nothing() {
        let f = fixture();

        f.engine.start(&DiscoveryConfig::default()).unwrap();
        sleep(Duration::from_secs(5)).await;

        assert!(f.engine.is_running());
        assert_eq!(f.sink.count(), 0);
    }

    #[test]
    fn test_start_outside_runtime_is_an_error() {
        let f = fixture();
        let result = f.engine.start(&direct_config(Ipv4Addr::new(10, 0, 0, 5)));
        assert!(matches!(result, Err(DiscoveryError::NoRuntime)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_from_another_thread() {
        let f = fixture();
        let engine = Arc::new(f.engine);
        engine.start(&direct_config(Ipv4Addr::new(10, 0, 0, 5))).unwrap();
        sleep(Duration::from_millis(1_500)).await;

        let remote = Arc::clone(&engine);
        std::thread::spawn(move || remote.stop()).join().unwrap();
        sleep(Duration::from_secs(5)).await;

        assert_eq!(f.sink.count(), 1);
    }
}
