//! Transaction manager.

use crate::error::CoreResult;
use crate::log::{LogRecord, RecordLog};
use crate::record::RecordId;
use crate::types::{SequenceNumber, TransactionId};
use crate::wal::{WalManager, WalRecord};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Coordinates WAL-journaled commits against the record log.
///
/// Writers serialize through [`TransactionManager::begin`]; the
/// returned guard holds the single-writer lock for the duration of the
/// transaction. Commit order is therefore total, and the sequence
/// counter advances once per committed transaction.
pub struct TransactionManager {
    wal: Arc<WalManager>,
    log: Arc<RecordLog>,
    next_txid: AtomicU64,
    next_sequence: AtomicU64,
    committed_sequence: AtomicU64,
    write_lock: Mutex<()>,
}

/// Exclusive write access for one transaction.
///
/// Dropping the guard without committing leaves at most a `Begin`
/// record in the WAL, which recovery discards.
pub struct WriteGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    txid: TransactionId,
}

impl WriteGuard<'_> {
    /// Returns the transaction id held by this guard.
    #[must_use]
    pub fn txid(&self) -> TransactionId {
        self.txid
    }
}

impl TransactionManager {
    /// Creates a manager over the given WAL and record log.
    pub fn new(wal: Arc<WalManager>, log: Arc<RecordLog>) -> Self {
        Self {
            wal,
            log,
            next_txid: AtomicU64::new(1),
            next_sequence: AtomicU64::new(1),
            committed_sequence: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    /// Begins a transaction, blocking until the write lock is held.
    pub fn begin(&self) -> WriteGuard<'_> {
        let guard = self.write_lock.lock();
        let txid = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        WriteGuard {
            _guard: guard,
            txid,
        }
    }

    /// Commits a put for one record.
    ///
    /// The WAL receives `Begin`/`Put`/`Commit` and is flushed before
    /// the record log is touched, so a crash at any point either
    /// replays or discards the whole transaction.
    pub fn commit_put(
        &self,
        guard: &WriteGuard<'_>,
        record_id: RecordId,
        payload: Vec<u8>,
    ) -> CoreResult<SequenceNumber> {
        let sequence = SequenceNumber::new(self.next_sequence.fetch_add(1, Ordering::SeqCst));
        let txid = guard.txid;

        self.wal.append(&WalRecord::Begin { txid })?;
        self.wal.append(&WalRecord::Put {
            txid,
            record_id,
            payload: payload.clone(),
        })?;
        self.wal.append(&WalRecord::Commit { txid, sequence })?;
        self.wal.flush()?;

        self.log.append(&LogRecord::put(record_id, payload, sequence))?;

        self.committed_sequence
            .store(sequence.as_u64(), Ordering::SeqCst);
        Ok(sequence)
    }

    /// Commits a delete for one record.
    pub fn commit_delete(
        &self,
        guard: &WriteGuard<'_>,
        record_id: RecordId,
    ) -> CoreResult<SequenceNumber> {
        let sequence = SequenceNumber::new(self.next_sequence.fetch_add(1, Ordering::SeqCst));
        let txid = guard.txid;

        self.wal.append(&WalRecord::Begin { txid })?;
        self.wal.append(&WalRecord::Delete { txid, record_id })?;
        self.wal.append(&WalRecord::Commit { txid, sequence })?;
        self.wal.flush()?;

        self.log
            .append(&LogRecord::tombstone(record_id, sequence))?;

        self.committed_sequence
            .store(sequence.as_u64(), Ordering::SeqCst);
        Ok(sequence)
    }

    /// Returns the highest committed sequence number.
    #[must_use]
    pub fn committed_sequence(&self) -> SequenceNumber {
        SequenceNumber::new(self.committed_sequence.load(Ordering::SeqCst))
    }

    /// Rebuilds the record log and replays committed WAL transactions
    /// it never received.
    ///
    /// Operations from transactions with a commit marker and a sequence
    /// above the log's high-water mark are reapplied; transactions
    /// without a commit marker (torn tail included) are discarded. The
    /// WAL is cleared afterwards.
    ///
    /// # Errors
    ///
    /// Interior WAL corruption (bad CRC, bad framing before the tail)
    /// fails recovery, and the store does not open.
    pub fn recover(&self) -> CoreResult<()> {
        let log_sequence = self.log.rebuild()?;

        let mut pending: HashMap<TransactionId, Vec<WalRecord>> = HashMap::new();
        let mut max_txid = 0u64;
        let mut max_sequence = log_sequence;
        let mut replayed = 0usize;
        let mut discarded = 0usize;

        for result in self.wal.iter()? {
            let (_, record) = result?;

            if let Some(txid) = record.txid() {
                if txid.as_u64() > max_txid {
                    max_txid = txid.as_u64();
                }
            }

            match record {
                WalRecord::Begin { txid } => {
                    pending.insert(txid, Vec::new());
                }
                WalRecord::Put { txid, .. } | WalRecord::Delete { txid, .. } => {
                    pending.entry(txid).or_default().push(record);
                }
                WalRecord::Commit { txid, sequence } => {
                    let ops = pending.remove(&txid).unwrap_or_default();
                    if sequence > max_sequence {
                        max_sequence = sequence;
                    }
                    if sequence > log_sequence {
                        for op in ops {
                            match op {
                                WalRecord::Put {
                                    record_id, payload, ..
                                } => {
                                    self.log
                                        .append(&LogRecord::put(record_id, payload, sequence))?;
                                }
                                WalRecord::Delete { record_id, .. } => {
                                    self.log
                                        .append(&LogRecord::tombstone(record_id, sequence))?;
                                }
                                _ => {}
                            }
                            replayed += 1;
                        }
                    }
                }
                WalRecord::Checkpoint { sequence } => {
                    if sequence > max_sequence {
                        max_sequence = sequence;
                    }
                }
            }
        }

        // Transactions without a commit marker are lost on purpose.
        discarded += pending.len();
        if discarded > 0 {
            warn!(discarded, "discarded uncommitted transactions during recovery");
        }
        if replayed > 0 {
            debug!(replayed, "replayed committed WAL operations into the log");
        }

        self.log.flush()?;
        self.log.sync()?;
        self.wal.clear()?;

        self.next_txid.store(max_txid + 1, Ordering::SeqCst);
        self.next_sequence
            .store(max_sequence.as_u64() + 1, Ordering::SeqCst);
        self.committed_sequence
            .store(max_sequence.as_u64(), Ordering::SeqCst);

        Ok(())
    }

    /// Flushes the record log and truncates the WAL.
    ///
    /// Safe to call at any quiet point; committed state is already in
    /// the log, so the WAL contents are redundant once the log is
    /// synced.
    pub fn checkpoint(&self) -> CoreResult<()> {
        let _guard = self.write_lock.lock();
        self.log.flush()?;
        self.log.sync()?;
        self.wal.clear()?;
        self.wal.append(&WalRecord::Checkpoint {
            sequence: self.committed_sequence(),
        })?;
        Ok(())
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("committed_sequence", &self.committed_sequence())
            .finish_non_exhaustive()
    }
}
