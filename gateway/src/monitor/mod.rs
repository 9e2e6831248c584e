//! C7: per-database connection health monitor. Adapts its ping interval
//! to the connection's last observed state and caps how many databases
//! can be pinged concurrently process-wide.

mod ping;

pub use ping::Pinger;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::config::MonitorConfig;
use common::lifecycle::Lifecycle;
use rand::Rng;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Up,
    Down,
}

impl From<u8> for ConnectionState {
    fn from(v: u8) -> Self {
        if v == 0 {
            ConnectionState::Up
        } else {
            ConnectionState::Down
        }
    }
}

impl ConnectionState {
    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Up => 0,
            ConnectionState::Down => 1,
        }
    }
}

/// Global cap on concurrently in-flight pings, shared across every
/// [`ConnectionMonitor`] in the process so a flapping fleet of databases
/// can't pile on unbounded concurrent connection attempts.
#[derive(Clone)]
pub struct PingLimiter {
    semaphore: Arc<Semaphore>,
}

impl PingLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        PingLimiter {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

/// Watches one database connection, adapting its tick interval: fast
/// polling (`error_interval`) while the connection is down, relaxed
/// polling (`normal_interval`) while it's up. State-change transitions
/// are logged as events for operators/alerting to pick up.
pub struct ConnectionMonitor {
    label: String,
    config: MonitorConfig,
    limiter: PingLimiter,
    pinger: Arc<dyn Pinger>,
    state: Arc<AtomicU8>,
    last_transition: Arc<Mutex<Instant>>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ConnectionMonitor {
    pub fn new(label: impl Into<String>, config: MonitorConfig, limiter: PingLimiter, pinger: Arc<dyn Pinger>) -> Self {
        ConnectionMonitor {
            label: label.into(),
            config,
            limiter,
            pinger,
            state: Arc::new(AtomicU8::new(ConnectionState::Up.as_u8())),
            last_transition: Arc::new(Mutex::new(Instant::now())),
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::SeqCst))
    }

    async fn tick(
        label: &str,
        pinger: &Arc<dyn Pinger>,
        limiter: &PingLimiter,
        state: &Arc<AtomicU8>,
        last_transition: &Arc<Mutex<Instant>>,
        timeout: Duration,
    ) {
        // Skip the probe rather than queue for a permit: a saturated limiter
        // means other databases are mid-ping, and blocking here would stall
        // this monitor's tick loop instead of just keeping the prior health.
        let _permit = match limiter.semaphore.try_acquire() {
            Ok(permit) => permit,
            Err(_) => {
                debug!(database = %label, "ping limiter saturated, skipping tick and keeping previous state");
                return;
            }
        };
        let result = tokio::time::timeout(timeout, pinger.ping()).await;
        let healthy = matches!(result, Ok(Ok(())));
        let new_state = if healthy { ConnectionState::Up } else { ConnectionState::Down };
        let prev = ConnectionState::from(state.swap(new_state.as_u8(), Ordering::SeqCst));
        if prev != new_state {
            let mut last = last_transition.lock().unwrap();
            let held_for = pretty_duration::pretty_duration(&last.elapsed(), None);
            *last = Instant::now();
            match new_state {
                ConnectionState::Down => warn!(database = %label, was_up_for = %held_for, "connection transitioned to down"),
                ConnectionState::Up => info!(database = %label, was_down_for = %held_for, "connection transitioned to up"),
            }
        }
    }
}

impl Lifecycle for ConnectionMonitor {
    fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let label = self.label.clone();
        let config = self.config.clone();
        let limiter = self.limiter.clone();
        let pinger = Arc::clone(&self.pinger);
        let state = Arc::clone(&self.state);
        let last_transition = Arc::clone(&self.last_transition);
        let running = Arc::clone(&self.running);
        let timeout = Duration::from_secs(config.ping_timeout_secs.max(1));

        let handle = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                Self::tick(&label, &pinger, &limiter, &state, &last_transition, timeout).await;
                let interval = match ConnectionState::from(state.load(Ordering::SeqCst)) {
                    ConnectionState::Up => config.normal_interval_secs,
                    ConnectionState::Down => config.error_interval_secs,
                };
                // A few hundred ms of jitter keeps a fleet of monitors from
                // all waking up and pinging in lockstep.
                let jitter_ms = rand::thread_rng().gen_range(0..250);
                tokio::time::sleep(Duration::from_secs(interval.max(1)) + Duration::from_millis(jitter_ms)).await;
            }
        });
        *self.handle.lock().unwrap() = Some(handle);
    }

    fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.handle.lock().unwrap().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::err::GatewayError;
    use std::sync::atomic::AtomicUsize;

    struct FlappingPinger {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Pinger for FlappingPinger {
        async fn ping(&self) -> Result<(), GatewayError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 0 {
                Ok(())
            } else {
                Err(GatewayError::invalid_argument("simulated ping failure"))
            }
        }
    }

    #[tokio::test]
    async fn transitions_state_on_ping_outcome() {
        let limiter = PingLimiter::new(5);
        let pinger = Arc::new(FlappingPinger { calls: AtomicUsize::new(0) });
        let state = Arc::new(AtomicU8::new(ConnectionState::Up.as_u8()));
        let last_transition = Arc::new(Mutex::new(Instant::now()));
        let timeout = Duration::from_millis(100);

        ConnectionMonitor::tick(
            "db1",
            &(pinger.clone() as Arc<dyn Pinger>),
            &limiter,
            &state,
            &last_transition,
            timeout,
        )
        .await;
        assert_eq!(ConnectionState::from(state.load(Ordering::SeqCst)), ConnectionState::Up);

        ConnectionMonitor::tick(
            "db1",
            &(pinger.clone() as Arc<dyn Pinger>),
            &limiter,
            &state,
            &last_transition,
            timeout,
        )
        .await;
        assert_eq!(ConnectionState::from(state.load(Ordering::SeqCst)), ConnectionState::Down);
    }

    #[tokio::test]
    async fn saturated_limiter_skips_the_tick_and_keeps_previous_state() {
        let limiter = PingLimiter::new(1);
        let _held = limiter.semaphore.try_acquire().unwrap();
        let pinger = Arc::new(FlappingPinger { calls: AtomicUsize::new(0) });
        let state = Arc::new(AtomicU8::new(ConnectionState::Up.as_u8()));
        let last_transition = Arc::new(Mutex::new(Instant::now()));
        let before = *last_transition.lock().unwrap();

        ConnectionMonitor::tick(
            "db1",
            &(pinger.clone() as Arc<dyn Pinger>),
            &limiter,
            &state,
            &last_transition,
            Duration::from_millis(100),
        )
        .await;

        assert_eq!(pinger.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ConnectionState::from(state.load(Ordering::SeqCst)), ConnectionState::Up);
        assert_eq!(*last_transition.lock().unwrap(), before);
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let config = MonitorConfig {
            normal_interval_secs: 30,
            error_interval_secs: 5,
            ping_timeout_secs: 1,
            max_concurrent_pings: 5,
        };
        let pinger = Arc::new(FlappingPinger { calls: AtomicUsize::new(0) });
        let monitor = ConnectionMonitor::new("db1", config, PingLimiter::new(5), pinger);
        monitor.start();
        monitor.start();
        assert!(monitor.handle.lock().unwrap().is_some());
        monitor.stop();
        monitor.stop();
    }
}
