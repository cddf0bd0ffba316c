// Durable key-value storage seam

use eyre::{Result, eyre};
use std::collections::HashMap;

/// Byte-oriented key-value store the task store persists through
///
/// Implementations must make `set` and `remove` durable before returning.
/// Removing a key that is not present is not an error.
pub trait KvStore {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key` entirely
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<K: KvStore + ?Sized> KvStore for Box<K> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// In-memory backend, used for tests and throwaway sessions
#[derive(Debug, Default, Clone)]
pub struct MemoryKv {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Keys double as file names and table keys, so keep them simple
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_set_get_remove() {
        let mut kv = MemoryKv::new();
        assert!(kv.get("tasks").unwrap().is_none());

        kv.set("tasks", b"[]").unwrap();
        assert_eq!(kv.get("tasks").unwrap().as_deref(), Some(&b"[]"[..]));

        kv.set("tasks", b"[1]").unwrap();
        assert_eq!(kv.get("tasks").unwrap().as_deref(), Some(&b"[1]"[..]));
        assert_eq!(kv.len(), 1);

        kv.remove("tasks").unwrap();
        assert!(!kv.contains_key("tasks"));
        assert!(kv.is_empty());
    }

    #[test]
    fn test_memory_remove_missing_key_is_ok() {
        let mut kv = MemoryKv::new();
        assert!(kv.remove("completedTasks").is_ok());
    }

    #[test]
    fn test_boxed_store_delegates() {
        let mut kv: Box<dyn KvStore> = Box::new(MemoryKv::new());
        kv.set("tasks", b"x").unwrap();
        assert_eq!(kv.get("tasks").unwrap(), Some(b"x".to_vec()));
        kv.remove("tasks").unwrap();
        assert_eq!(kv.get("tasks").unwrap(), None);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("tasks").is_ok());
        assert!(validate_key("completedTasks").is_ok());
        assert!(validate_key("with_under-dash").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("has space").is_err());
        assert!(validate_key(&"a".repeat(65)).is_err());
    }
}
