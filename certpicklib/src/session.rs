//! Runs one certificate selection: decode candidates, populate a disposable collection, present the
//! picker and map the chosen certificate back to the caller's candidate list.
//!
//! A session progresses through the [Phase] values in order. Fatal conditions (failure to open either
//! store, failure to present the picker) end the session with an error. Per-candidate failures (decode
//! or add) are recorded in the [SelectionOutcome] and the remaining candidates are processed.
//!
//! Every handle acquired by a session is owned by a [ScopedHandle] local to [SelectionSession::select],
//! so each is released exactly once however the call ends.

use std::cell::Cell;

use log::{debug, error, info, warn};

use crate::{
    decoder::{decode_certificate_text, ParsedCertificate},
    handle::ScopedHandle,
    options::SelectOptions,
    provider::{CertPicker, CertStoreProvider},
    resolver::resolve_and_add,
    selection::{CandidateStatus, Selection, SelectionOutcome},
    Error, PlatformFailure, Result,
};

/// Stages of a selection session
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Opening the disposable collection and reference store
    Init,
    /// Decoding candidates in original order
    Decoding,
    /// Adding decoded candidates to the collection in reverse order
    Resolving,
    /// Picker is displayed
    Presenting,
    /// Matching the chosen certificate to a candidate
    Mapping,
    /// Session completed with a selection or no selection
    Done,
    /// Session ended with an error
    Failed,
}

/// Candidate that was decoded and for which a platform certificate context exists
struct DecodedCertificate<'s, S: CertStoreProvider> {
    parsed: ParsedCertificate,
    context: ScopedHandle<'s, S>,
}

/// Selects a certificate from a candidate list using the given store provider and picker
pub struct SelectionSession<'a, S: CertStoreProvider, P: CertPicker + ?Sized> {
    store: &'a S,
    picker: &'a P,
    options: &'a SelectOptions,
    phase: Cell<Phase>,
}

impl<'a, S: CertStoreProvider, P: CertPicker + ?Sized> SelectionSession<'a, S, P> {
    /// Creates a new session
    pub fn new(store: &'a S, picker: &'a P, options: &'a SelectOptions) -> Self {
        SelectionSession {
            store,
            picker,
            options,
            phase: Cell::new(Phase::Init),
        }
    }

    /// Returns the phase the most recent call to [SelectionSession::select] reached
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    fn enter(&self, phase: Phase) {
        debug!("Selection session: {:?} -> {phase:?}", self.phase.get());
        self.phase.set(phase);
    }

    fn fail(&self, e: Error) -> Error {
        self.enter(Phase::Failed);
        e
    }

    /// Opens the disposable collection then the reference store. If the reference store cannot be
    /// opened the collection is released before returning.
    fn open_stores(&self) -> Result<(ScopedHandle<'a, S>, ScopedHandle<'a, S>)> {
        let collection = match self.store.open_collection() {
            Ok(raw) => ScopedHandle::store(raw, self.store),
            Err(e) => {
                error!("Failed to create disposable collection: {e:?}");
                return Err(e);
            }
        };
        if !collection.is_valid() {
            error!("Failed to create disposable collection: invalid handle");
            return Err(Error::StoreOpen(PlatformFailure::new("CertOpenStore", 0)));
        }

        let reference = match self
            .store
            .open_reference_store(&self.options.reference_store)
        {
            Ok(raw) => ScopedHandle::store(raw, self.store),
            Err(e) => {
                error!(
                    "Failed to open {} certificate store: {e:?}",
                    self.options.reference_store
                );
                return Err(e);
            }
        };
        if !reference.is_valid() {
            error!(
                "Failed to open {} certificate store: invalid handle",
                self.options.reference_store
            );
            return Err(Error::StoreOpen(PlatformFailure::new("CertOpenStore", 0)));
        }

        Ok((collection, reference))
    }

    fn decode_candidate(&self, index: usize, text: &str) -> Result<DecodedCertificate<'a, S>> {
        let parsed = match decode_certificate_text(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Failed to decode candidate #{index}: {e:?}");
                return Err(e);
            }
        };
        let context = match self.store.create_cert_context(parsed.der()) {
            Ok(raw) => ScopedHandle::cert_context(raw, self.store),
            Err(e) => {
                warn!("Failed to create certificate context for candidate #{index}: {e:?}");
                return Err(e);
            }
        };
        if !context.is_valid() {
            warn!("Failed to create certificate context for candidate #{index}: invalid handle");
            return Err(Error::CertContext(PlatformFailure::new(
                "CertCreateCertificateContext",
                0,
            )));
        }
        debug!(
            "Decoded candidate #{index}: {} ({})",
            parsed.subject(),
            parsed.thumbprint()
        );
        Ok(DecodedCertificate { parsed, context })
    }

    /// Presents the picker constrained to `candidates` and returns the index of the chosen candidate.
    ///
    /// Returns [Selection::NoSelection] when the picker is dismissed without a choice or the chosen
    /// certificate does not match any offered candidate. Returns an error if the stores cannot be opened
    /// or the picker cannot be displayed.
    pub fn select<T: AsRef<str>>(&self, candidates: &[T]) -> Result<SelectionOutcome> {
        self.enter(Phase::Init);
        let (collection, reference) = self.open_stores().map_err(|e| self.fail(e))?;

        self.enter(Phase::Decoding);
        let decoded: Vec<Result<DecodedCertificate<'a, S>>> = candidates
            .iter()
            .enumerate()
            .map(|(index, text)| self.decode_candidate(index, text.as_ref()))
            .collect();
        if self.options.fail_when_nothing_decodes
            && !decoded.is_empty()
            && decoded.iter().all(|d| d.is_err())
        {
            error!("None of the {} candidates could be decoded", decoded.len());
            return Err(self.fail(Error::NoDecodableCandidates));
        }

        self.enter(Phase::Resolving);
        let mut statuses: Vec<CandidateStatus> = decoded
            .iter()
            .enumerate()
            .rev()
            .map(|(index, d)| match d {
                Err(e) => CandidateStatus::DecodeFailed(*e),
                Ok(dc) => match resolve_and_add(
                    self.store,
                    &reference,
                    &collection,
                    &dc.parsed,
                    &dc.context,
                ) {
                    Ok(from) => CandidateStatus::Offered(from),
                    Err(e) => {
                        warn!("Failed to add candidate #{index} to collection: {e:?}");
                        CandidateStatus::AddFailed(e)
                    }
                },
            })
            .collect();
        statuses.reverse();

        let offered = statuses
            .iter()
            .filter(|s| matches!(s, CandidateStatus::Offered(_)))
            .count();
        debug!("{offered} of {} candidates offered", candidates.len());
        if offered == 0 && self.options.skip_picker_when_empty {
            info!("No candidates to offer, skipping picker");
            self.enter(Phase::Done);
            return Ok(SelectionOutcome {
                selection: Selection::NoSelection,
                candidates: statuses,
            });
        }

        self.enter(Phase::Presenting);
        let chosen = match self.picker.pick(collection.get(), &self.options.prompt()) {
            Ok(chosen) => chosen.map(|raw| ScopedHandle::cert_context(raw, self.store)),
            Err(e) => {
                error!("Failed to display certificate picker: {e:?}");
                return Err(self.fail(e));
            }
        };

        self.enter(Phase::Mapping);
        let selection = match chosen.filter(|c| c.is_valid()) {
            None => {
                info!("No certificate was selected");
                Selection::NoSelection
            }
            Some(chosen) => {
                let der_chosen = self.store.encoded_cert(chosen.get()).map_err(|e| {
                    error!("Failed to read selected certificate: {e:?}");
                    self.fail(e)
                })?;
                match decoded.iter().zip(statuses.iter()).position(|(d, s)| {
                    matches!(s, CandidateStatus::Offered(_))
                        && matches!(d, Ok(dc) if dc.parsed.der() == der_chosen.as_slice())
                }) {
                    Some(index) => {
                        info!("Selected candidate #{index}");
                        Selection::Index(index)
                    }
                    None => {
                        warn!("Selected certificate does not match any candidate");
                        Selection::NoSelection
                    }
                }
            }
        };

        self.enter(Phase::Done);
        Ok(SelectionOutcome {
            selection,
            candidates: statuses,
        })
    }

    /// As [SelectionSession::select] but returns the index or [NO_SELECTION](crate::NO_SELECTION)
    pub fn select_index<T: AsRef<str>>(&self, candidates: &[T]) -> Result<i32> {
        Ok(self.select(candidates)?.selection.as_index())
    }
}
