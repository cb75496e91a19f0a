//! Status state machine for a single transfer.
//!
//! `pending -> arrived -> picked_up -> dropped_off`, one step at a time, with a
//! single-shot undo of the most recent non-terminal step. The functions here
//! mutate a borrowed [`Transfer`] and never touch storage.

use chrono::{DateTime, Utc};

use crate::domain::errors::DomainError;
use crate::domain::transfer::{HistoryEntry, Transfer, TransferStatus};

/// Note recorded on an undo entry when the caller supplies none.
pub const DEFAULT_UNDO_NOTE: &str = "Status reverted";

pub fn advance<'a>(
    transfer: &'a mut Transfer,
    target: &str,
    note: &str,
) -> Result<&'a Transfer, DomainError> {
    advance_at(transfer, target, note, Utc::now())
}

pub fn advance_at<'a>(
    transfer: &'a mut Transfer,
    target: &str,
    note: &str,
    now: DateTime<Utc>,
) -> Result<&'a Transfer, DomainError> {
    let note = note.trim();
    if note.is_empty() {
        return Err(DomainError::validation("a confirmation note is required"));
    }

    let target: TransferStatus = target.parse()?;
    if transfer.status.next() != Some(target) {
        return Err(DomainError::IllegalTransition {
            from: transfer.status,
            to: target,
        });
    }

    for entry in &mut transfer.history {
        entry.can_undo = false;
    }

    transfer.history.push(HistoryEntry {
        status: target,
        note: note.to_string(),
        timestamp: now,
        can_undo: !target.is_terminal(),
        is_undo: false,
    });
    transfer.status = target;
    transfer.updated_at = now;

    Ok(transfer)
}

pub fn undo<'a>(
    transfer: &'a mut Transfer,
    target: &str,
    note: Option<&str>,
) -> Result<&'a Transfer, DomainError> {
    undo_at(transfer, target, note, Utc::now())
}

/// Replaces the last history entry with an irreversible undo entry.
///
/// The target is only checked for being a known status, not for being the
/// status that preceded the undone step.
pub fn undo_at<'a>(
    transfer: &'a mut Transfer,
    target: &str,
    note: Option<&str>,
    now: DateTime<Utc>,
) -> Result<&'a Transfer, DomainError> {
    let Some(last) = transfer.history.last() else {
        return Err(DomainError::EmptyHistory);
    };
    if !last.can_undo {
        return Err(DomainError::NotUndoable);
    }

    let target: TransferStatus = target.parse()?;
    let note = note
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .unwrap_or(DEFAULT_UNDO_NOTE);

    transfer.history.pop();
    transfer.history.push(HistoryEntry {
        status: target,
        note: note.to_string(),
        timestamp: now,
        can_undo: false,
        is_undo: true,
    });
    transfer.status = target;
    transfer.updated_at = now;

    Ok(transfer)
}
