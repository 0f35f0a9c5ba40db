use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use marquee_core::events::{EventPublisher, LifecycleEvent, PublishError, RecordingPublisher};
use marquee_core::ops::activation_ops::CodeEntropy;
use marquee_core::ops::ordering::ReorderPlan;
use marquee_core::{
    ContentTarget, DeviceCode, DeviceCodeRepository, Display, DisplayRepository,
    DisplaySelector, Location, MarqueeError, MemoryStore, RedirectRule, Repository, Result,
    RuleRepository,
};
use marquee_engine::{Engine, ManualClock, MarqueeConfig, RetryPolicy};

/// Bytes that encode to the user code `ABCD-EFGH`
#[allow(dead_code)]
pub const ABCD_EFGH: [u8; 5] = [0x00, 0x44, 0x32, 0x14, 0xC7];

/// 2025-03-04 was a Tuesday
#[allow(dead_code)]
pub fn tuesday(h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 4, h, mi, 0).unwrap()
}

#[allow(dead_code)]
pub fn lobby_north() -> Location {
    Location::new("hq", "lobby", "north")
}

#[allow(dead_code)]
pub fn rule(name: &str, priority: i64, selector: DisplaySelector) -> RedirectRule {
    RedirectRule::new(name, priority, selector, ContentTarget::new("page", "1", name))
}

/// Entropy with unique device codes and a scripted sequence of user codes
///
/// Once the script runs out, user codes are derived from a counter.
#[derive(Debug, Default)]
pub struct ScriptedEntropy {
    user_codes: Vec<[u8; 5]>,
    next_user: AtomicU32,
    counter: AtomicU64,
}

impl ScriptedEntropy {
    #[allow(dead_code)]
    pub fn new(user_codes: Vec<[u8; 5]>) -> Self {
        Self {
            user_codes,
            ..Self::default()
        }
    }
}

impl CodeEntropy for ScriptedEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        if dest.len() == 5 {
            let i = self.next_user.fetch_add(1, Ordering::SeqCst) as usize;
            if let Some(bytes) = self.user_codes.get(i) {
                dest.copy_from_slice(bytes);
                return Ok(());
            }
        }
        let seed = n.to_le_bytes();
        for (i, b) in dest.iter_mut().enumerate() {
            *b = seed[i % seed.len()] ^ (i as u8);
        }
        Ok(())
    }
}

/// Publisher that always fails
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct BrokenPublisher;

impl EventPublisher for BrokenPublisher {
    fn publish(&self, _event: &LifecycleEvent) -> std::result::Result<(), PublishError> {
        Err(PublishError("bus unavailable".into()))
    }
}

/// Repository whose first `failures` display updates report a conflict
#[allow(dead_code)]
pub struct ContendedRepo {
    inner: MemoryStore,
    failures: AtomicU32,
    pub attempts: AtomicU32,
}

impl ContendedRepo {
    #[allow(dead_code)]
    pub fn new(failures: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures: AtomicU32::new(failures),
            attempts: AtomicU32::new(0),
        }
    }
}

impl DisplayRepository for ContendedRepo {
    fn save_display(&self, display: &Display, expected_version: Option<u64>) -> Result<u64> {
        if let Some(expected) = expected_version {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(MarqueeError::VersionConflict {
                    display_id: display.id.clone(),
                    expected_version: expected,
                });
            }
        }
        self.inner.save_display(display, expected_version)
    }

    fn find_display_by_id(&self, id: &str) -> Result<Option<Display>> {
        self.inner.find_display_by_id(id)
    }

    fn find_display_by_name(&self, name: &str) -> Result<Option<Display>> {
        self.inner.find_display_by_name(name)
    }

    fn list_displays(&self) -> Result<Vec<Display>> {
        self.inner.list_displays()
    }

    fn delete_display(&self, id: &str) -> Result<()> {
        self.inner.delete_display(id)
    }
}

impl DeviceCodeRepository for ContendedRepo {
    fn save_device_code(&self, code: &DeviceCode) -> Result<()> {
        self.inner.save_device_code(code)
    }

    fn find_by_device_code(&self, device_code: &str) -> Result<Option<DeviceCode>> {
        self.inner.find_by_device_code(device_code)
    }

    fn find_by_user_code(&self, user_code: &str) -> Result<Option<DeviceCode>> {
        self.inner.find_by_user_code(user_code)
    }

    fn mark_device_code_activated(
        &self,
        id: &str,
        display_id: &str,
        activated_at: DateTime<Utc>,
    ) -> Result<DeviceCode> {
        self.inner
            .mark_device_code_activated(id, display_id, activated_at)
    }

    fn delete_device_code(&self, id: &str) -> Result<()> {
        self.inner.delete_device_code(id)
    }

    fn delete_expired_device_codes(&self, now: DateTime<Utc>) -> Result<usize> {
        self.inner.delete_expired_device_codes(now)
    }
}

impl RuleRepository for ContendedRepo {
    fn insert_rule(&self, rule: &RedirectRule) -> Result<()> {
        self.inner.insert_rule(rule)
    }

    fn save_rule(&self, rule: &RedirectRule, expected_priority: i64) -> Result<()> {
        self.inner.save_rule(rule, expected_priority)
    }

    fn get_rule(&self, name: &str) -> Result<Option<RedirectRule>> {
        self.inner.get_rule(name)
    }

    fn list_rules(&self) -> Result<Vec<RedirectRule>> {
        self.inner.list_rules()
    }

    fn delete_rule(&self, name: &str) -> Result<()> {
        self.inner.delete_rule(name)
    }

    fn apply_priorities(&self, plan: &ReorderPlan, at: DateTime<Utc>) -> Result<()> {
        self.inner.apply_priorities(plan, at)
    }
}

/// Store that slips `pending` in right after the first rule listing, so
/// the caller plans from a snapshot that is already out of date
#[allow(dead_code)]
pub struct RacingRepo {
    inner: Arc<dyn Repository>,
    pending: Mutex<Option<RedirectRule>>,
    pub listings: AtomicU32,
}

impl RacingRepo {
    #[allow(dead_code)]
    pub fn new(inner: Arc<dyn Repository>, pending: RedirectRule) -> Self {
        Self {
            inner,
            pending: Mutex::new(Some(pending)),
            listings: AtomicU32::new(0),
        }
    }
}

impl DisplayRepository for RacingRepo {
    fn save_display(&self, display: &Display, expected_version: Option<u64>) -> Result<u64> {
        self.inner.save_display(display, expected_version)
    }

    fn find_display_by_id(&self, id: &str) -> Result<Option<Display>> {
        self.inner.find_display_by_id(id)
    }

    fn find_display_by_name(&self, name: &str) -> Result<Option<Display>> {
        self.inner.find_display_by_name(name)
    }

    fn list_displays(&self) -> Result<Vec<Display>> {
        self.inner.list_displays()
    }

    fn delete_display(&self, id: &str) -> Result<()> {
        self.inner.delete_display(id)
    }
}

impl DeviceCodeRepository for RacingRepo {
    fn save_device_code(&self, code: &DeviceCode) -> Result<()> {
        self.inner.save_device_code(code)
    }

    fn find_by_device_code(&self, device_code: &str) -> Result<Option<DeviceCode>> {
        self.inner.find_by_device_code(device_code)
    }

    fn find_by_user_code(&self, user_code: &str) -> Result<Option<DeviceCode>> {
        self.inner.find_by_user_code(user_code)
    }

    fn mark_device_code_activated(
        &self,
        id: &str,
        display_id: &str,
        activated_at: DateTime<Utc>,
    ) -> Result<DeviceCode> {
        self.inner
            .mark_device_code_activated(id, display_id, activated_at)
    }

    fn delete_device_code(&self, id: &str) -> Result<()> {
        self.inner.delete_device_code(id)
    }

    fn delete_expired_device_codes(&self, now: DateTime<Utc>) -> Result<usize> {
        self.inner.delete_expired_device_codes(now)
    }
}

impl RuleRepository for RacingRepo {
    fn insert_rule(&self, rule: &RedirectRule) -> Result<()> {
        self.inner.insert_rule(rule)
    }

    fn save_rule(&self, rule: &RedirectRule, expected_priority: i64) -> Result<()> {
        self.inner.save_rule(rule, expected_priority)
    }

    fn get_rule(&self, name: &str) -> Result<Option<RedirectRule>> {
        self.inner.get_rule(name)
    }

    fn list_rules(&self) -> Result<Vec<RedirectRule>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        let rules = self.inner.list_rules()?;
        if let Some(rule) = self.pending.lock().unwrap().take() {
            self.inner.insert_rule(&rule)?;
        }
        Ok(rules)
    }

    fn delete_rule(&self, name: &str) -> Result<()> {
        self.inner.delete_rule(name)
    }

    fn apply_priorities(&self, plan: &ReorderPlan, at: DateTime<Utc>) -> Result<()> {
        self.inner.apply_priorities(plan, at)
    }
}

/// Engine wired for tests: pinned clock, recorded events, no retry delay
#[allow(dead_code)]
pub struct Harness {
    pub engine: Engine,
    pub clock: Arc<ManualClock>,
    pub events: Arc<RecordingPublisher>,
    pub repo: Arc<dyn Repository>,
}

#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with(Arc::new(MemoryStore::new()), ScriptedEntropy::default(), MarqueeConfig::default())
}

#[allow(dead_code)]
pub fn harness_with(
    repo: Arc<dyn Repository>,
    entropy: ScriptedEntropy,
    config: MarqueeConfig,
) -> Harness {
    let clock = Arc::new(ManualClock::new(tuesday(10, 0)));
    let events = Arc::new(RecordingPublisher::new());
    let mut engine = Engine::from_parts(
        repo.clone(),
        events.clone(),
        clock.clone(),
        Arc::new(entropy),
        config,
    )
    .expect("valid config");
    engine.displays = engine
        .displays
        .clone()
        .with_retry_policy(RetryPolicy::immediate(5));
    engine.rules = engine
        .rules
        .clone()
        .with_retry_policy(RetryPolicy::immediate(5));
    Harness {
        engine,
        clock,
        events,
        repo,
    }
}
