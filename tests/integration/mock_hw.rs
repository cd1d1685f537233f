//! Mock adapters for integration tests.
//!
//! Providers record every physical change so tests can assert on the full
//! command history without touching real GPIO or UART registers.  All
//! handles are `Rc`-shared so the test keeps a view after moving a clone
//! into the service.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use embassy_time::Instant;

use relaynode::app::ports::{Clock, FastMemoryPort, StorageError, StoragePort};
use relaynode::app::service::RelayService;
use relaynode::config::{RelayConfig, SystemConfig};
use relaynode::drivers::RelayProvider;
use relaynode::persistence::Persistence;
use relaynode::relay::RelayId;

// ── ManualClock ───────────────────────────────────────────────

/// Clock that only moves when the test says so.
#[derive(Clone, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

#[allow(dead_code)]
impl ManualClock {
    pub fn set(&self, ms: u64) {
        self.0.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }

    pub fn millis(&self) -> u64 {
        self.0.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.0.get())
    }
}

// ── RecordingProvider ─────────────────────────────────────────

/// `(relay, status)` for every physical change, in firing order.
pub type ChangeLog = Rc<RefCell<Vec<(RelayId, bool)>>>;

pub struct RecordingProvider {
    relay: RelayId,
    log: ChangeLog,
}

impl RecordingProvider {
    pub fn new(relay: RelayId, log: &ChangeLog) -> Self {
        Self {
            relay,
            log: Rc::clone(log),
        }
    }
}

impl RelayProvider for RecordingProvider {
    fn id(&self) -> &'static str {
        "test"
    }

    fn change(&mut self, status: bool) {
        self.log.borrow_mut().push((self.relay, status));
    }
}

// ── MemStore / MemFast ────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemStore(Rc<RefCell<HashMap<String, Vec<u8>>>>);

#[allow(dead_code)]
impl MemStore {
    pub fn put(&self, namespace: &str, key: &str, data: &[u8]) {
        self.0
            .borrow_mut()
            .insert(format!("{}::{}", namespace, key), data.to_vec());
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<String> {
        self.0
            .borrow()
            .get(&format!("{}::{}", namespace, key))
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }
}

impl StoragePort for MemStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let store = self.0.borrow();
        let data = store
            .get(&format!("{}::{}", namespace, key))
            .ok_or(StorageError::NotFound)?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.put(namespace, key, data);
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.0.borrow_mut().remove(&format!("{}::{}", namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.0
            .borrow()
            .contains_key(&format!("{}::{}", namespace, key))
    }
}

#[derive(Clone, Default)]
pub struct MemFast(Rc<Cell<Option<u32>>>);

#[allow(dead_code)]
impl MemFast {
    /// A copy that survived a warm reset.
    pub fn warm(mask: u32) -> Self {
        Self(Rc::new(Cell::new(Some(mask))))
    }

    pub fn mask(&self) -> Option<u32> {
        self.0.get()
    }
}

impl FastMemoryPort for MemFast {
    fn is_valid(&self) -> bool {
        self.0.get().is_some()
    }

    fn relay_mask(&self) -> u32 {
        self.0.get().unwrap_or(0)
    }

    fn set_relay_mask(&mut self, mask: u32) {
        self.0.set(Some(mask));
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// A service wired to mocks, plus the test's handles on them.
pub struct Rig {
    pub service: RelayService<ManualClock>,
    pub clock: ManualClock,
    pub changes: ChangeLog,
    pub store: MemStore,
    pub fast: MemFast,
}

#[allow(dead_code)]
impl Rig {
    /// `relays` recording relays, booted and settled at t=0 with an empty
    /// change log.
    pub fn new(config: SystemConfig, relays: usize) -> Self {
        let mut rig = Self::unbooted(config, MemStore::default(), MemFast::default());
        rig.add_recorders(relays);
        rig.service.boot();
        rig.tick();
        rig.changes.borrow_mut().clear();
        rig
    }

    /// Service over the given storage, no relays, not booted.
    pub fn unbooted(config: SystemConfig, store: MemStore, fast: MemFast) -> Self {
        let clock = ManualClock::default();
        let persistence = Persistence::new(
            Box::new(fast.clone()),
            Box::new(store.clone()),
            embassy_time::Duration::from_millis(u64::from(config.save_delay_ms)),
        );
        Self {
            service: RelayService::new(config, clock.clone(), persistence),
            clock,
            changes: ChangeLog::default(),
            store,
            fast,
        }
    }

    pub fn map_service(
        self,
        f: impl FnOnce(RelayService<ManualClock>) -> RelayService<ManualClock>,
    ) -> Self {
        Self {
            service: f(self.service),
            ..self
        }
    }

    pub fn add_recorders(&mut self, count: usize) {
        for _ in 0..count {
            let id = self.service.count();
            let provider = RecordingProvider::new(id, &self.changes);
            assert_eq!(self.service.add_relay(Box::new(provider)), Some(id));
        }
    }

    /// Move the clock to `ms` and run one iteration.
    pub fn tick_at(&mut self, ms: u64) {
        self.clock.set(ms);
        self.service.tick();
    }

    pub fn tick(&mut self) {
        self.service.tick();
    }

    pub fn changes(&self) -> Vec<(RelayId, bool)> {
        self.changes.borrow().clone()
    }

    pub fn statuses(&self) -> Vec<bool> {
        (0..self.service.count())
            .map(|id| self.service.status(id))
            .collect()
    }
}

/// Config with `count` relays, each adjusted by `f`.
pub fn config_with(count: usize, f: impl Fn(&mut RelayConfig)) -> SystemConfig {
    let mut cfg = SystemConfig::default();
    cfg.relays.clear();
    for _ in 0..count {
        let mut relay = RelayConfig::default();
        f(&mut relay);
        cfg.relays.push(relay).expect("at most 32 relays");
    }
    cfg
}
