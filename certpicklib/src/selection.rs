//! Results reported by a selection session

use crate::Error;

/// Index value reported when nothing was selected
pub const NO_SELECTION: i32 = -1;

/// Final result of a selection session that did not fail
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Selection {
    /// Zero-based index into the caller's candidate list
    Index(usize),
    /// Picker was cancelled, nothing was offered or the chosen certificate matched no candidate
    NoSelection,
}

impl Selection {
    /// Returns the selected index, or [NO_SELECTION] when nothing was selected
    pub fn as_index(&self) -> i32 {
        match self {
            Selection::Index(i) => i32::try_from(*i).unwrap_or(NO_SELECTION),
            Selection::NoSelection => NO_SELECTION,
        }
    }

    /// Returns the selected index, if any
    pub fn index(&self) -> Option<usize> {
        match self {
            Selection::Index(i) => Some(*i),
            Selection::NoSelection => None,
        }
    }
}

/// Indicates which certificate was placed in the disposable collection for a candidate
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResolvedFrom {
    /// Entry from the reference store with the same issuer and serial number
    ReferenceStore,
    /// Candidate as supplied by the caller
    Candidate,
}

/// What became of one candidate during a session
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CandidateStatus {
    /// Candidate could not be decoded and was not offered
    DecodeFailed(Error),
    /// Candidate decoded but could not be added to the collection
    AddFailed(Error),
    /// Candidate was offered in the collection
    Offered(ResolvedFrom),
}

/// Selection plus per-candidate status, aligned to the caller's candidate order
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SelectionOutcome {
    /// What the user selected
    pub selection: Selection,
    /// Status of each candidate, by original index
    pub candidates: Vec<CandidateStatus>,
}

impl SelectionOutcome {
    /// Returns the number of candidates that were offered in the collection
    pub fn offered(&self) -> usize {
        self.candidates
            .iter()
            .filter(|s| matches!(s, CandidateStatus::Offered(_)))
            .count()
    }
}

#[test]
fn sentinel_is_distinct_from_first_index() {
    assert_eq!(Selection::NoSelection.as_index(), -1);
    assert_eq!(Selection::Index(0).as_index(), 0);
    assert_eq!(Selection::Index(3).index(), Some(3));
    assert_eq!(Selection::NoSelection.index(), None);
}
