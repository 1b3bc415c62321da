//! Status normalizer
//!
//! Maps raw UI signals (class names, visible text, data attributes) onto the
//! closed [`Status`] vocabulary. The keyword table is ordered: call states
//! come before ambient availability text so an active call is never masked
//! by a generic "available" label elsewhere on the page. Preserve this
//! precedence when extending the table.

use deskglow_domain::{RawStatusSignal, Status};

/// Ordered keyword → status table. Table order is the tie-break for
/// substring matches; do not sort it.
const KEYWORD_TABLE: &[(&str, Status)] = &[
    ("ringing", Status::Ringing),
    ("on call", Status::OnCall),
    ("on the phone", Status::OnCall),
    ("talking", Status::OnCall),
    ("dnd", Status::Dnd),
    ("do not disturb", Status::Dnd),
    ("busy", Status::Dnd),
    ("meeting", Status::Dnd),
    ("away", Status::Away),
    ("idle", Status::Away),
    ("lunch", Status::Away),
    ("offline", Status::Offline),
    ("unavailable", Status::Offline),
    ("logged out", Status::Offline),
    ("available", Status::Available),
];

/// Normalize one raw signal into a status.
///
/// Candidates are considered in signal priority order (class names, then
/// text, then attribute values). Returns `None` when nothing matches; the
/// caller applies its own default.
pub fn normalize(signal: &RawStatusSignal) -> Option<Status> {
    signal.candidates().find_map(match_keyword)
}

/// Match a single candidate string against the keyword table.
///
/// Exact (case-insensitive, trimmed) matches win outright; otherwise the
/// first table key contained in the candidate wins.
pub fn match_keyword(candidate: &str) -> Option<Status> {
    let lowered = candidate.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    for (keyword, status) in KEYWORD_TABLE {
        if lowered == *keyword {
            return Some(*status);
        }
    }

    for (keyword, status) in KEYWORD_TABLE {
        if lowered.contains(keyword) {
            return Some(*status);
        }
    }

    None
}
