mod entry;
mod log;

pub use entry::{entry_hash, AuditEntry, AuditStatus, NewAuditEntry, Phase};
pub use log::{AuditLog, BreakKind, ChainHead, IntegrityBreak, IntegrityReport};
