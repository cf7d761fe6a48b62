//! Runtime configuration and clock abstraction.
//!
//! Every config type offers `Default` plus `from_env()`, which overrides the
//! defaults with any valid environment value. Unparseable values are ignored.
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use battle_core::{GameMode, MONSTER_TYPES, Team};
use directories::ProjectDirs;
use rand::Rng;

/// Whether moves go through commit-reveal or are revealed in the clear.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProtocolMode {
    #[default]
    CommitReveal,
    /// The ledger accepts the move directly; no commit step.
    RevealOnly,
}

/// Turn synchronizer settings.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    /// Grace period after `timeout_at` before a match counts as abandoned.
    pub abandon_margin_secs: u64,
    pub protocol: ProtocolMode,
    pub command_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5_000),
            abandon_margin_secs: 600,
            protocol: ProtocolMode::CommitReveal,
            command_buffer: 32,
        }
    }
}

impl SyncConfig {
    /// - `SYNC_POLL_INTERVAL_MS`
    /// - `SYNC_ABANDON_MARGIN_SECS`
    /// - `SYNC_REVEAL_ONLY`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = read_env::<u64>("SYNC_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(secs) = read_env::<u64>("SYNC_ABANDON_MARGIN_SECS") {
            config.abandon_margin_secs = secs;
        }
        if read_env_bool("SYNC_REVEAL_ONLY") == Some(true) {
            config.protocol = ProtocolMode::RevealOnly;
        }

        config
    }
}

/// Bounded exponential backoff for transient ledger faults.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// - `RETRY_MAX_ATTEMPTS`
    /// - `RETRY_BASE_DELAY_MS`
    pub fn from_env() -> Self {
        let mut policy = Self::default();

        if let Some(attempts) = read_env::<u32>("RETRY_MAX_ATTEMPTS") {
            policy.max_attempts = attempts.max(1);
        }
        if let Some(ms) = read_env::<u64>("RETRY_BASE_DELAY_MS") {
            policy.base_delay = Duration::from_millis(ms);
        }

        policy
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// Equal jitter: the delay lies in `[backoff/2, backoff]` where backoff
    /// doubles per attempt up to `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self
            .base_delay
            .saturating_mul(1 << exponent)
            .min(self.max_delay);

        let backoff_ms = backoff.as_millis() as u64;
        if backoff_ms <= 1 {
            return backoff;
        }
        let half_ms = backoff_ms / 2;
        let jitter_ms = rand::thread_rng().gen_range(0..=half_ms);
        Duration::from_millis(half_ms.saturating_add(jitter_ms))
    }
}

/// How a session picks its team.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeamSelection {
    Fixed(Team),
    /// Two random monster types per join.
    Random,
}

impl TeamSelection {
    /// Team to bring into the next match.
    pub fn pick(&self) -> Team {
        match self {
            TeamSelection::Fixed(team) => *team,
            TeamSelection::Random => {
                let mut rng = rand::thread_rng();
                Team::new(
                    rng.gen_range(1..=MONSTER_TYPES),
                    rng.gen_range(1..=MONSTER_TYPES),
                )
            }
        }
    }
}

/// Participant session settings.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub mode: GameMode,
    /// Restrict automatic move choice to offensive moves.
    pub offense_only: bool,
    /// Stay in the queue instead of only joining when an opponent waits.
    pub wait_in_queue: bool,
    /// Pause between acquisition attempts.
    pub idle_interval: Duration,
    /// Directory for the PendingCommit store.
    pub data_dir: PathBuf,
    pub team: TeamSelection,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: GameMode(2),
            offense_only: false,
            wait_in_queue: false,
            idle_interval: Duration::from_millis(5_000),
            data_dir: default_data_dir(),
            team: TeamSelection::Random,
        }
    }
}

impl SessionConfig {
    /// - `SESSION_MODE`
    /// - `SESSION_OFFENSE_ONLY`
    /// - `SESSION_WAIT_IN_QUEUE`
    /// - `SESSION_IDLE_MS`
    /// - `SESSION_DATA_DIR`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(mode) = read_env::<u64>("SESSION_MODE") {
            config.mode = GameMode(mode);
        }
        if let Some(flag) = read_env_bool("SESSION_OFFENSE_ONLY") {
            config.offense_only = flag;
        }
        if let Some(flag) = read_env_bool("SESSION_WAIT_IN_QUEUE") {
            config.wait_in_queue = flag;
        }
        if let Some(ms) = read_env::<u64>("SESSION_IDLE_MS") {
            config.idle_interval = Duration::from_millis(ms);
        }
        if let Some(dir) = read_env::<PathBuf>("SESSION_DATA_DIR") {
            config.data_dir = dir;
        }

        config
    }
}

/// Platform data directory, falling back to `./.battles` when none exists.
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "battles")
        .map(|dirs| dirs.data_dir().join("pending"))
        .unwrap_or_else(|| PathBuf::from(".battles/pending"))
}

/// Source of "now" in unix seconds.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Settable clock for tests and simulations.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(now_secs: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now_secs)),
        }
    }

    pub fn set(&self, now_secs: u64) {
        self.now.store(now_secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub(crate) fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

pub(crate) fn read_env_bool(key: &str) -> Option<bool> {
    match env::var(key).ok()?.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_stays_within_equal_jitter_bounds() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_secs(5));
        for attempt in 1..=5 {
            let full = 100u64 << (attempt - 1);
            let delay = policy.delay_for(attempt).as_millis() as u64;
            assert!(delay >= full / 2 && delay <= full, "attempt {attempt}: {delay}");
        }
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy::new(20, Duration::from_millis(100), Duration::from_millis(400));
        assert!(policy.delay_for(15) <= Duration::from_millis(400));
    }

    #[test]
    fn zero_delay_policy_never_sleeps() {
        assert_eq!(RetryPolicy::none().delay_for(3), Duration::ZERO);
        assert_eq!(RetryPolicy::none().max_attempts, 1);
    }

    #[test]
    fn random_team_uses_known_monsters() {
        for _ in 0..32 {
            let team = TeamSelection::Random.pick();
            assert!(team.units.iter().all(|unit| (1..=MONSTER_TYPES).contains(unit)));
        }
        let fixed = Team::new(2, 7);
        assert_eq!(TeamSelection::Fixed(fixed).pick(), fixed);
    }

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new(10);
        let other = clock.clone();
        other.advance(5);
        assert_eq!(clock.now_secs(), 15);
    }
}
