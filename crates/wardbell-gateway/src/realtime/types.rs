use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use wardbell_core::error::{Result, WardbellError};
use wardbell_core::protocol::Role;

/// Process-unique connection identity. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Floor applied to every keepalive timer; a zero period would spin or panic.
pub const MIN_KEEPALIVE: Duration = Duration::from_millis(100);

/// Keepalive timing and limits for one connection.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Read deadline; reset on every inbound frame.
    pub pong_wait: Duration,
    /// Must stay below `pong_wait`.
    pub ping_period: Duration,
    /// Upper bound for a single write + flush.
    pub write_wait: Duration,
    pub max_message_bytes: usize,
    pub outbound_queue: usize,
}

impl ConnectionSettings {
    /// Derive the ping period as 9/10 of the peer-idle tolerance.
    ///
    /// `pong_wait` and `write_wait` are clamped to at least `MIN_KEEPALIVE`.
    pub fn from_pong_wait(
        pong_wait: Duration,
        write_wait: Duration,
        max_message_bytes: usize,
        outbound_queue: usize,
    ) -> Self {
        let pong_wait = pong_wait.max(MIN_KEEPALIVE);
        let write_wait = write_wait.max(MIN_KEEPALIVE);
        Self {
            pong_wait,
            ping_period: pong_wait * 9 / 10,
            write_wait,
            max_message_bytes,
            outbound_queue: outbound_queue.max(1),
        }
    }
}

impl ConnectionSettings {
    /// Ping period actually scheduled, never below `MIN_KEEPALIVE`.
    pub fn ping_interval(&self) -> Duration {
        self.ping_period.max(MIN_KEEPALIVE)
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from_pong_wait(Duration::from_secs(60), Duration::from_secs(10), 512, 256)
    }
}

/// Connection state machine: `Open -> Closing -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Open,
    Closing,
    Closed,
}

/// Shared lifecycle cell observed by both pumps.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    tx: Arc<watch::Sender<ConnState>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnState::Open);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> ConnState {
        *self.tx.borrow()
    }

    /// `Open -> Closing`. Returns true only for the caller that made the transition.
    pub fn begin_close(&self) -> bool {
        self.tx.send_if_modified(|s| {
            if *s == ConnState::Open {
                *s = ConnState::Closing;
                true
            } else {
                false
            }
        })
    }

    /// Terminal. Called once both pumps have exited.
    pub fn finish(&self) {
        self.tx.send_replace(ConnState::Closed);
    }

    /// Resolves as soon as the state leaves `Open`.
    pub async fn closing(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|s| *s != ConnState::Open).await;
    }

    /// Resolves once the state is `Closed`.
    pub async fn closed(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|s| *s == ConnState::Closed).await;
    }
}

/// Notification routing target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    User(String),
    Doctor(String),
    Admins,
    All,
}

impl Target {
    /// Parse the `target`/`code` pair used by the HTTP dispatch entry points.
    pub fn parse(target: &str, code: Option<&str>) -> Result<Self> {
        let code = code.map(str::trim).filter(|c| !c.is_empty());
        match target {
            "all" => Ok(Target::All),
            other => match other.parse::<Role>()? {
                Role::Admin => Ok(Target::Admins),
                Role::Patient => code
                    .map(|c| Target::User(c.to_string()))
                    .ok_or_else(|| WardbellError::BadRequest("user target requires code".into())),
                Role::Doctor => code
                    .map(|c| Target::Doctor(c.to_string()))
                    .ok_or_else(|| WardbellError::BadRequest("doctor target requires code".into())),
            },
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Target::User(_) => "user",
            Target::Doctor(_) => "doctor",
            Target::Admins => "admin",
            Target::All => "all",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::User(code) => write!(f, "user:{code}"),
            Target::Doctor(code) => write!(f, "doctor:{code}"),
            Target::Admins => f.write_str("admin"),
            Target::All => f.write_str("all"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_period_is_nine_tenths() {
        let s = ConnectionSettings::default();
        assert_eq!(s.ping_period, Duration::from_secs(54));
        assert!(s.ping_period < s.pong_wait);
    }

    #[test]
    fn zero_timings_are_clamped() {
        let s = ConnectionSettings::from_pong_wait(Duration::ZERO, Duration::ZERO, 512, 0);
        assert_eq!(s.pong_wait, MIN_KEEPALIVE);
        assert_eq!(s.write_wait, MIN_KEEPALIVE);
        assert!(s.ping_interval() >= MIN_KEEPALIVE);
        assert_eq!(s.outbound_queue, 1);

        let raw = ConnectionSettings {
            ping_period: Duration::ZERO,
            ..ConnectionSettings::default()
        };
        assert_eq!(raw.ping_interval(), MIN_KEEPALIVE);
    }

    #[test]
    fn ids_are_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn lifecycle_transitions_once() {
        let l = Lifecycle::new();
        assert_eq!(l.state(), ConnState::Open);
        assert!(l.begin_close());
        assert!(!l.begin_close());
        assert_eq!(l.state(), ConnState::Closing);
        l.finish();
        assert_eq!(l.state(), ConnState::Closed);
        assert!(!l.begin_close());
    }

    #[test]
    fn target_parsing() {
        assert_eq!(Target::parse("all", None).ok(), Some(Target::All));
        assert_eq!(Target::parse("admin", Some("x")).ok(), Some(Target::Admins));
        assert_eq!(
            Target::parse("patient", Some(" U1 ")).ok(),
            Some(Target::User("U1".into()))
        );
        assert!(Target::parse("doctor", None).is_err());
        assert!(Target::parse("nurse", Some("N1")).is_err());
    }
}
