use chrono::{DateTime, SubsecRound, Utc};
use glob::glob;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::checksum::sha256;
use crate::error::{GuardError, Result};
use super::entry::{AuditEntry, NewAuditEntry};

const ENTRIES_DIR: &str = "entries";
const HEAD_FILE: &str = "chain_head.json";
const TMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainHead {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
}

impl ChainHead {
    fn genesis() -> Self {
        Self {
            hash: sha256(""),
            timestamp: Utc::now(),
            sequence: 0,
        }
    }

    fn from_entry(entry: &AuditEntry) -> Self {
        Self {
            hash: entry.hash.clone(),
            timestamp: entry.timestamp,
            sequence: entry.sequence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    PreviousHashMismatch,
    HashMismatch,
    SequenceGap,
    DuplicateSequence,
    Unreadable,
    HeadMismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityBreak {
    pub sequence: Option<u64>,
    #[serde(default)]
    pub id: Option<Uuid>,
    pub kind: BreakKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub valid: bool,
    pub errors: Vec<IntegrityBreak>,
    pub entries_verified: usize,
}

impl IntegrityReport {
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }
}

/// Append-only, hash-chained audit log persisted as one JSON file per entry.
///
/// The chain head is cached in memory behind a mutex so that the
/// read-head / write-entry / advance-head sequence of [`AuditLog::append`]
/// cannot interleave between threads sharing one log.
pub struct AuditLog {
    dir: PathBuf,
    head: Mutex<ChainHead>,
}

impl AuditLog {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(dir.join(ENTRIES_DIR))?;

        let head_path = dir.join(HEAD_FILE);
        let stored_head: Option<ChainHead> = if head_path.exists() {
            let content = fs::read_to_string(&head_path)?;
            match serde_json::from_str(&content) {
                Ok(head) => Some(head),
                Err(e) => {
                    warn!(
                        "Unreadable chain head {}, rebuilding from entries: {}",
                        head_path.display(),
                        e
                    );
                    None
                }
            }
        } else {
            None
        };

        remove_partial_writes(&dir.join(ENTRIES_DIR));
        let (entries, _) = load_entries(&dir);
        let latest = entries.last().map(ChainHead::from_entry);

        let head = match (stored_head, latest) {
            (Some(head), Some(latest)) if latest.sequence > head.sequence => {
                warn!(
                    "Chain head at sequence {} is behind entry {}, recovering",
                    head.sequence, latest.sequence
                );
                latest
            }
            (Some(head), _) => head,
            (None, Some(latest)) => {
                info!("Recovered chain head from {} entries", entries.len());
                latest
            }
            (None, None) => ChainHead::genesis(),
        };

        debug!("Opened audit log {} at sequence {}", dir.display(), head.sequence);

        let log = Self {
            dir,
            head: Mutex::new(head),
        };
        log.flush()?;
        Ok(log)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn head(&self) -> Result<ChainHead> {
        Ok(self.lock_head()?.clone())
    }

    pub fn append(&self, fields: NewAuditEntry) -> Result<AuditEntry> {
        let mut head = self.lock_head()?;

        let sequence = head.sequence + 1;
        let entry = AuditEntry::seal(sequence, fields, head.hash.clone(), Utc::now().trunc_subsecs(3));

        self.write_entry(&entry)?;
        *head = ChainHead::from_entry(&entry);
        self.write_head(&head)?;

        debug!(
            "Appended audit entry {} ({} {}) at sequence {}",
            entry.id, entry.phase, entry.action, entry.sequence
        );

        Ok(entry)
    }

    /// Persists the in-memory chain head.
    pub fn flush(&self) -> Result<()> {
        let head = self.lock_head()?;
        self.write_head(&head)
    }

    /// All readable entries in sequence order.
    pub fn entries(&self) -> Result<Vec<AuditEntry>> {
        let (entries, unreadable) = load_entries(&self.dir);
        if let Some((path, reason)) = unreadable.first() {
            return Err(GuardError::AuditLog(format!(
                "unreadable entry {}: {}",
                path.display(),
                reason
            )));
        }
        Ok(entries)
    }

    pub fn entries_where<F>(&self, predicate: F) -> Result<Vec<AuditEntry>>
    where
        F: Fn(&AuditEntry) -> bool,
    {
        Ok(self.entries()?.into_iter().filter(|e| predicate(e)).collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock_head()?.sequence as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Replays the whole chain from the `H("")` seed and reports every break.
    pub fn verify_integrity(&self) -> IntegrityReport {
        let head = self.lock_head();
        let (entries, unreadable) = load_entries(&self.dir);
        let mut errors = Vec::new();

        for (path, reason) in &unreadable {
            errors.push(IntegrityBreak {
                sequence: None,
                id: None,
                kind: BreakKind::Unreadable,
                message: format!("unreadable entry {}: {}", path.display(), reason),
            });
        }

        let mut expected_previous = sha256("");
        let mut expected_sequence = 1u64;

        for entry in &entries {
            if entry.sequence < expected_sequence {
                errors.push(IntegrityBreak {
                    sequence: Some(entry.sequence),
                    id: Some(entry.id),
                    kind: BreakKind::DuplicateSequence,
                    message: format!("entry {}: duplicate sequence number", entry.sequence),
                });
            } else if entry.sequence > expected_sequence {
                errors.push(IntegrityBreak {
                    sequence: Some(entry.sequence),
                    id: Some(entry.id),
                    kind: BreakKind::SequenceGap,
                    message: format!(
                        "entry {}: sequence gap, expected {}",
                        entry.sequence, expected_sequence
                    ),
                });
            }

            if entry.previous_hash != expected_previous {
                errors.push(IntegrityBreak {
                    sequence: Some(entry.sequence),
                    id: Some(entry.id),
                    kind: BreakKind::PreviousHashMismatch,
                    message: format!(
                        "entry {}: previous hash {} does not match chain {}",
                        entry.sequence, entry.previous_hash, expected_previous
                    ),
                });
            }

            if entry.compute_hash() != entry.hash {
                errors.push(IntegrityBreak {
                    sequence: Some(entry.sequence),
                    id: Some(entry.id),
                    kind: BreakKind::HashMismatch,
                    message: format!("entry {}: stored hash does not match its contents", entry.sequence),
                });
            }

            expected_previous = entry.hash.clone();
            expected_sequence = entry.sequence + 1;
        }

        match head {
            Ok(head) => {
                let last_sequence = entries.last().map(|e| e.sequence).unwrap_or(0);
                if head.sequence != last_sequence || head.hash != expected_previous {
                    errors.push(IntegrityBreak {
                        sequence: Some(head.sequence),
                        id: entries.last().map(|e| e.id),
                        kind: BreakKind::HeadMismatch,
                        message: format!(
                            "chain head at sequence {} does not match last entry {}",
                            head.sequence, last_sequence
                        ),
                    });
                }
            }
            Err(e) => errors.push(IntegrityBreak {
                sequence: None,
                id: None,
                kind: BreakKind::HeadMismatch,
                message: e.to_string(),
            }),
        }

        if errors.is_empty() {
            debug!("Audit chain verified: {} entries", entries.len());
        } else {
            warn!("Audit chain has {} integrity breaks", errors.len());
        }

        IntegrityReport {
            valid: errors.is_empty(),
            errors,
            entries_verified: entries.len() + unreadable.len(),
        }
    }

    fn lock_head(&self) -> Result<MutexGuard<'_, ChainHead>> {
        self.head
            .lock()
            .map_err(|_| GuardError::AuditLog("chain head lock poisoned".to_string()))
    }

    fn write_entry(&self, entry: &AuditEntry) -> Result<()> {
        let name = format!("{:020}-{}.json", entry.sequence, entry.id);
        let path = self.dir.join(ENTRIES_DIR).join(&name);
        let tmp = self.dir.join(ENTRIES_DIR).join(format!("{}{}", name, TMP_SUFFIX));

        let mut file = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
        file.write_all(serde_json::to_string_pretty(entry)?.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn write_head(&self, head: &ChainHead) -> Result<()> {
        let path = self.dir.join(HEAD_FILE);
        let tmp = self.dir.join(format!("{}{}", HEAD_FILE, TMP_SUFFIX));

        let mut file = fs::File::create(&tmp)?;
        file.write_all(serde_json::to_string_pretty(head)?.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Drops entry files left half-written by an interrupted append.
fn remove_partial_writes(entries_dir: &Path) {
    let pattern = entries_dir.join(format!("*{}", TMP_SUFFIX));
    let Ok(paths) = glob(&pattern.to_string_lossy()) else {
        return;
    };
    for path in paths.filter_map(|r| r.ok()) {
        warn!("Removing partially written audit entry {}", path.display());
        if let Err(e) = fs::remove_file(&path) {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

fn load_entries(dir: &Path) -> (Vec<AuditEntry>, Vec<(PathBuf, String)>) {
    let pattern = dir.join(ENTRIES_DIR).join("*.json");
    let pattern_str = pattern.to_string_lossy();

    let paths: Vec<PathBuf> = match glob(&pattern_str) {
        Ok(paths) => paths.filter_map(|r| r.ok()).collect(),
        Err(e) => return (Vec::new(), vec![(pattern.clone(), e.to_string())]),
    };

    let mut entries = Vec::new();
    let mut unreadable = Vec::new();

    for path in paths {
        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str::<AuditEntry>(&content).map_err(|e| e.to_string()));
        match parsed {
            Ok(entry) => entries.push(entry),
            Err(reason) => unreadable.push((path, reason)),
        }
    }

    entries.sort_by_key(|e| e.sequence);
    (entries, unreadable)
}
