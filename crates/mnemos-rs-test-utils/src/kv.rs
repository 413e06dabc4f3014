use async_trait::async_trait;
use mnemos_rs_memory::{BackendError, KeyValueStore};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct KvState {
    values: HashMap<String, String>,
    sets: HashMap<String, BTreeSet<String>>,
    ttls: HashMap<String, u64>,
    ops: Vec<String>,
}

/// Key-value store kept in a map. TTLs are recorded, never enforced.
#[derive(Default)]
pub struct MemoryKv {
    state: Mutex<KvState>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make SET/SADD/EXPIRE/DEL fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make GET/SMEMBERS fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Commands applied so far, e.g. `SET session:s1`.
    pub fn ops(&self) -> Vec<String> {
        self.state.lock().ops.clone()
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.state.lock().values.get(key).cloned()
    }

    pub fn ttl(&self, key: &str) -> Option<u64> {
        self.state.lock().ttls.get(key).copied()
    }

    pub fn members(&self, key: &str) -> Vec<String> {
        self.state
            .lock()
            .sets
            .get(key)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop a key without recording an op, as if it expired.
    pub fn expire_now(&self, key: &str) {
        let mut state = self.state.lock();
        state.values.remove(key);
        state.sets.remove(key);
        state.ttls.remove(key);
    }

    fn check(&self, flag: &AtomicBool, command: &str) -> Result<(), BackendError> {
        if flag.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                status: 503,
                body: format!("{command} unavailable"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), BackendError> {
        self.check(&self.fail_writes, "SET")?;
        let mut state = self.state.lock();
        state.values.insert(key.to_string(), value.to_string());
        state.ttls.insert(key.to_string(), ttl_secs);
        state.ops.push(format!("SET {key}"));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.check(&self.fail_reads, "GET")?;
        Ok(self.state.lock().values.get(key).cloned())
    }

    async fn del(&self, key: &str) -> Result<bool, BackendError> {
        self.check(&self.fail_writes, "DEL")?;
        let mut state = self.state.lock();
        state.ops.push(format!("DEL {key}"));
        state.ttls.remove(key);
        let removed_value = state.values.remove(key).is_some();
        let removed_set = state.sets.remove(key).is_some();
        Ok(removed_value || removed_set)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), BackendError> {
        self.check(&self.fail_writes, "SADD")?;
        let mut state = self.state.lock();
        state
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        state.ops.push(format!("SADD {key}"));
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), BackendError> {
        self.check(&self.fail_writes, "EXPIRE")?;
        let mut state = self.state.lock();
        state.ttls.insert(key.to_string(), ttl_secs);
        state.ops.push(format!("EXPIRE {key}"));
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, BackendError> {
        self.check(&self.fail_reads, "SMEMBERS")?;
        Ok(self.members(key))
    }
}
