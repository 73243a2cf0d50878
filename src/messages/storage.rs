//! Local conversation store
//!
//! Each conversation partner gets one entry in a key-value backend holding
//! the JSON array of its messages. Reads and writes never fail the caller:
//! broken or missing data reads as an empty conversation, single records
//! that do not parse as messages are skipped, and failed writes are logged
//! and dropped.

use super::types::Message;
use crate::{PolypalError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

pub const DEFAULT_NAMESPACE: &str = "polypal_messages_";

/// Minimal string key-value backend, modelled on browser local storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Derive the storage key for a partner.
///
/// The identifier is percent-escaped so reserved characters cannot collide
/// with other partners or leave the namespace.
pub fn conversation_key(namespace: &str, partner: &str) -> String {
    let escaped: String = form_urlencoded::byte_serialize(partner.as_bytes()).collect();
    format!("{}{}", namespace, escaped)
}

/// In-process backend, cheap to clone; clones share the same entries
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total size of stored keys and values, like a browser quota
    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Write a raw value, bypassing the quota
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key.into(), value.into());
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write();

        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(PolypalError::StorageUnavailable(format!(
                    "Quota of {} bytes exceeded",
                    quota
                )));
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON file per key under a data directory
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        debug!("FileStore initialized: base_dir={:?}", base_dir);
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Escape again so arbitrary keys stay a single file name
        let file_name: String = form_urlencoded::byte_serialize(key.as_bytes()).collect();
        self.base_dir.join(format!("{}.json", file_name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PolypalError::StorageUnavailable(format!(
                "Failed to read {:?}: {}",
                path, e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.base_dir).map_err(|e| {
            PolypalError::StorageUnavailable(format!("Failed to create {:?}: {}", self.base_dir, e))
        })?;

        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, value)
            .and_then(|_| fs::rename(&tmp_path, &path))
            .map_err(|e| {
                PolypalError::StorageUnavailable(format!("Failed to write {:?}: {}", path, e))
            })?;

        Ok(())
    }
}

/// Append-only per-partner message logs on top of a [`KeyValueStore`]
#[derive(Clone)]
pub struct ConversationStore {
    backend: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn key_for(&self, partner: &str) -> String {
        conversation_key(&self.namespace, partner)
    }

    /// Load a partner's messages, empty on any failure
    pub fn load(&self, partner: &str) -> Vec<Message> {
        match self.try_load(partner) {
            Ok(messages) => messages,
            Err(e) => {
                error!("Failed to load messages for {:?}: {}", partner, e);
                Vec::new()
            }
        }
    }

    /// Load a partner's messages, reporting why the load failed
    pub fn try_load(&self, partner: &str) -> Result<Vec<Message>> {
        let records = self.load_records(partner)?;

        let messages: Vec<Message> = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value(record) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("Skipping unreadable record {} for {:?}: {}", index, partner, e);
                    None
                }
            })
            .collect();
        Ok(messages)
    }

    /// Raw JSON records of a conversation, without schema checks
    fn load_records(&self, partner: &str) -> Result<Vec<serde_json::Value>> {
        let raw = match self.backend.get(&self.key_for(partner))? {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(Vec::new()),
        };

        let records: Vec<serde_json::Value> = serde_json::from_str(&raw)?;
        Ok(records)
    }

    /// Append a message to a partner's log, logging and dropping failures
    pub fn append(&self, partner: &str, message: Message) {
        if let Err(e) = self.try_append(partner, message) {
            error!("Failed to save message for {:?}: {}", partner, e);
        }
    }

    pub fn try_append(&self, partner: &str, message: Message) -> Result<()> {
        if !message.sender.is_persistable() {
            debug!("Not persisting system notice for {:?}", partner);
            return Ok(());
        }

        // Records this build cannot read are carried over untouched
        let mut records = match self.load_records(partner) {
            Ok(records) => records,
            // An unreadable log is replaced, matching the read-side "treat as empty"
            Err(PolypalError::CorruptRecord(reason)) => {
                warn!("Discarding corrupt conversation for {:?}: {}", partner, reason);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let record = serde_json::to_value(&message)
            .map_err(|e| PolypalError::StorageUnavailable(format!("Serialization failed: {}", e)))?;
        records.push(record);

        let json = serde_json::to_string(&records)
            .map_err(|e| PolypalError::StorageUnavailable(format!("Serialization failed: {}", e)))?;
        self.backend.set(&self.key_for(partner), &json)?;

        debug!(
            "Appended message to conversation {:?} ({} total)",
            partner,
            records.len()
        );
        Ok(())
    }
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Open the default on-disk store under `dir`
pub fn open_file_store(dir: impl Into<PathBuf>) -> ConversationStore {
    let store = FileStore::new(dir);
    info!("Using conversation directory {:?}", store.base_dir());
    ConversationStore::new(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::types::Sender;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(PolypalError::StorageUnavailable("disk on fire".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(PolypalError::StorageUnavailable("disk on fire".into()))
        }
    }

    fn memory_store() -> (MemoryStore, ConversationStore) {
        let backend = MemoryStore::new();
        let store = ConversationStore::new(Arc::new(backend.clone()));
        (backend, store)
    }

    #[test]
    fn test_key_escapes_reserved_characters() {
        assert_eq!(conversation_key(DEFAULT_NAMESPACE, "Ana"), "polypal_messages_Ana");
        assert_eq!(
            conversation_key(DEFAULT_NAMESPACE, "a/b&c=d"),
            "polypal_messages_a%2Fb%26c%3Dd"
        );
        assert_ne!(
            conversation_key(DEFAULT_NAMESPACE, "a b"),
            conversation_key(DEFAULT_NAMESPACE, "a+b")
        );
    }

    #[test]
    fn test_load_missing_is_empty() {
        let (_, store) = memory_store();
        assert!(store.load("nobody").is_empty());
    }

    #[test]
    fn test_round_trip_with_reserved_characters() {
        let (_, store) = memory_store();
        let partners = ["Ana", "José María", "a/b?c=d&e", "100%", "名前", "x\"y\\z"];

        for partner in partners {
            let first = Message::text(Sender::User, format!("hi {}", partner));
            let second = Message::text(Sender::Bot, "Thanks for your message!");
            store.append(partner, first.clone());
            store.append(partner, second.clone());

            assert_eq!(store.load(partner), vec![first, second]);
        }
    }

    #[test]
    fn test_append_preserves_order() {
        let (_, store) = memory_store();
        let a = Message::text(Sender::User, "A");
        let b = Message::text(Sender::User, "B");

        store.append("Ana", a.clone());
        store.append("Ana", b.clone());

        assert_eq!(store.load("Ana"), vec![a, b]);
    }

    #[test]
    fn test_partners_are_isolated() {
        let (_, store) = memory_store();
        store.append("Ana", Message::text(Sender::User, "for Ana"));

        assert!(store.load("Ben").is_empty());
        assert!(store.load("ana").is_empty());
    }

    #[test]
    fn test_corrupt_payload_reads_as_empty() {
        let (backend, store) = memory_store();
        backend.insert_raw(store.key_for("Ana"), "{not json");

        assert!(store.load("Ana").is_empty());
        assert!(matches!(
            store.try_load("Ana"),
            Err(PolypalError::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_unreadable_record_does_not_hide_the_rest() {
        let (backend, store) = memory_store();
        backend.insert_raw(
            store.key_for("Ana"),
            r#"[{"sender":"user","timestamp":1,"type":"text","text":"keep me"},{"sender":"user","timestamp":2,"type":"audio"}]"#,
        );

        let loaded = store.load("Ana");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].as_text(), Some("keep me"));

        store.append("Ana", Message::text(Sender::User, "new"));

        let texts: Vec<_> = store
            .load("Ana")
            .iter()
            .map(|m| m.as_text().map(str::to_string))
            .collect();
        assert_eq!(texts, vec![Some("keep me".to_string()), Some("new".to_string())]);

        // The unreadable record is still on disk
        let raw = backend.get(&store.key_for("Ana")).unwrap().unwrap();
        let records: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1]["type"], "audio");
    }

    #[test]
    fn test_unknown_message_type_is_skipped() {
        let (backend, store) = memory_store();
        backend.insert_raw(
            store.key_for("Ana"),
            r#"[{"sender":"bot","timestamp":1,"type":"sticker","id":7},{"sender":"bot","timestamp":2,"type":"text","text":"hi"}]"#,
        );

        let loaded = store.load("Ana");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].sender, Sender::Bot);
    }

    #[test]
    fn test_append_replaces_corrupt_payload() {
        let (backend, store) = memory_store();
        backend.insert_raw(store.key_for("Ana"), "[[[");

        let msg = Message::text(Sender::User, "fresh start");
        store.append("Ana", msg.clone());

        assert_eq!(store.load("Ana"), vec![msg]);
    }

    #[test]
    fn test_write_failure_keeps_last_good_sequence() {
        let backend = MemoryStore::new().with_quota(200);
        let store = ConversationStore::new(Arc::new(backend));

        let first = Message::text(Sender::User, "short");
        store.append("Ana", first.clone());

        // Does not panic or propagate
        store.append("Ana", Message::text(Sender::User, "x".repeat(500)));

        assert_eq!(store.load("Ana"), vec![first]);
    }

    #[test]
    fn test_write_failure_with_no_history_reads_empty() {
        let backend = MemoryStore::new().with_quota(10);
        let store = ConversationStore::new(Arc::new(backend));

        store.append("Ana", Message::text(Sender::User, "too big for the quota"));
        assert!(store.load("Ana").is_empty());
    }

    #[test]
    fn test_broken_backend_degrades() {
        let store = ConversationStore::new(Arc::new(BrokenStore));

        store.append("Ana", Message::text(Sender::User, "lost"));
        assert!(store.load("Ana").is_empty());
        assert!(matches!(
            store.try_append("Ana", Message::text(Sender::User, "lost")),
            Err(PolypalError::StorageUnavailable(_))
        ));
    }

    #[test]
    fn test_system_messages_are_not_persisted() {
        let (backend, store) = memory_store();
        store.append("Ana", Message::text(Sender::System, "Message blocked"));

        assert!(backend.is_empty());
        assert!(store.load("Ana").is_empty());
    }

    #[test]
    fn test_custom_namespace() {
        let (backend, _) = memory_store();
        let store = ConversationStore::new(Arc::new(backend.clone())).with_namespace("test_");
        store.append("Ana", Message::text(Sender::User, "hi"));

        assert!(backend.get("test_Ana").unwrap().is_some());
        assert!(backend.get("polypal_messages_Ana").unwrap().is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_file_store(dir.path().join("conversations"));

        let msg = Message::audio(Sender::User, "data:audio/wav;base64,UklGRg==", Some(1500));
        store.append("Ana/Ben", msg.clone());

        // A second store over the same directory sees the same log
        let reopened = open_file_store(dir.path().join("conversations"));
        assert_eq!(reopened.load("Ana/Ben"), vec![msg]);
    }

    #[test]
    fn test_file_store_missing_dir_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing"));
        assert_eq!(store.get("anything").unwrap(), None);
    }
}
