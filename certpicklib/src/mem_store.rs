//! In-memory implementations of [CertStoreProvider] and [CertPicker] with handle-count instrumentation
//!
//! [MemCertStore] keeps named durable stores, disposable collections and certificate contexts in
//! process memory. Every handle it returns is tracked until released, which allows tests to confirm
//! that a session leaves nothing open and never releases a handle twice. Collections behave like a
//! CAPI memory store populated with `CERT_STORE_ADD_ALWAYS`: duplicates are retained, and the most
//! recently added entry is the one exposed when identities collide.
//!
//! [ScriptedPicker] stands in for the modal dialog.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
};

use log::debug;

use crate::{
    decoder::{CertIdentity, ParsedCertificate},
    handle::{RawHandle, ReleaseHandle},
    provider::{CertPicker, CertStoreProvider, PickerPrompt},
    Error, PlatformFailure, Result,
};

/// Status used when a failure is injected (`E_FAIL`)
const INJECTED_FAILURE: u32 = 0x8000_4005;
/// Status used when a certificate cannot be parsed (`CRYPT_E_ASN1_BADTAG`)
const BAD_CERT_ENCODING: u32 = 0x8009_310B;
/// Status used when a handle is unknown (`ERROR_INVALID_HANDLE`)
const INVALID_HANDLE: u32 = 6;

/// Certificate held in a store or referenced by a certificate context
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemCertEntry {
    /// DER-encoded certificate
    pub der: Vec<u8>,
    /// Issuer and serial number
    pub identity: CertIdentity,
    /// Name of the key provider associated with the entry, if any. Only entries placed in a durable
    /// store carry one.
    pub key_provider: Option<String>,
}

#[derive(Debug)]
enum MemObject {
    /// Durable store, by name
    Store(String),
    /// Disposable collection, by collection id
    Collection(usize),
    Cert(MemCertEntry),
}

#[derive(Debug, Default)]
struct MemState {
    next_handle: usize,
    live: BTreeMap<RawHandle, MemObject>,
    durable: BTreeMap<String, Vec<MemCertEntry>>,
    collections: BTreeMap<usize, Vec<MemCertEntry>>,
    next_collection: usize,
    fail_add: Vec<Vec<u8>>,
}

/// In-memory certificate stores with handle tracking
#[derive(Debug, Default)]
pub struct MemCertStore {
    state: RefCell<MemState>,
    double_releases: Cell<usize>,
    handles_opened: Cell<usize>,
    fail_collection_open: Cell<bool>,
    fail_reference_open: Cell<bool>,
    fail_reference_search: Cell<bool>,
}

impl MemCertStore {
    /// Creates an instance with no durable stores
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a certificate in the named durable store, optionally associated with a key provider
    pub fn add_to_reference_store(
        &self,
        name: &str,
        der_cert: &[u8],
        key_provider: Option<&str>,
    ) -> Result<()> {
        let pc = ParsedCertificate::from_der(der_cert.to_vec())?;
        self.state
            .borrow_mut()
            .durable
            .entry(name.to_string())
            .or_default()
            .push(MemCertEntry {
                der: der_cert.to_vec(),
                identity: pc.identity().clone(),
                key_provider: key_provider.map(str::to_string),
            });
        Ok(())
    }

    /// Causes subsequent [CertStoreProvider::open_collection] calls to fail
    pub fn fail_collection_open(&self) {
        self.fail_collection_open.set(true);
    }

    /// Causes subsequent [CertStoreProvider::open_reference_store] calls to fail
    pub fn fail_reference_open(&self) {
        self.fail_reference_open.set(true);
    }

    /// Causes subsequent [CertStoreProvider::find_by_identity] calls to fail
    pub fn fail_reference_search(&self) {
        self.fail_reference_search.set(true);
    }

    /// Causes [CertStoreProvider::add_cert_context] to fail for the given certificate
    pub fn fail_add_for(&self, der_cert: &[u8]) {
        self.state.borrow_mut().fail_add.push(der_cert.to_vec());
    }

    /// Returns the number of handles that have been returned and not yet released
    pub fn live_handles(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// Returns the total number of handles that have been returned
    pub fn handles_opened(&self) -> usize {
        self.handles_opened.get()
    }

    /// Returns the number of release calls made for handles that were not live
    pub fn double_releases(&self) -> usize {
        self.double_releases.get()
    }

    /// Returns the entries of an open collection as the picker would see them: most recently added
    /// first, with one entry per identity. Returns an empty vector if `collection` is not an open
    /// collection.
    pub fn collection_entries(&self, collection: RawHandle) -> Vec<MemCertEntry> {
        let state = self.state.borrow();
        let Some(MemObject::Collection(id)) = state.live.get(&collection) else {
            return vec![];
        };
        let mut visible: Vec<MemCertEntry> = vec![];
        if let Some(entries) = state.collections.get(id) {
            for entry in entries.iter().rev() {
                if !visible.iter().any(|v| v.identity == entry.identity) {
                    visible.push(entry.clone());
                }
            }
        }
        visible
    }

    fn allocate(&self, object: MemObject) -> RawHandle {
        let mut state = self.state.borrow_mut();
        state.next_handle += 1;
        let handle = RawHandle(0x1000 + state.next_handle * 8);
        state.live.insert(handle, object);
        self.handles_opened.set(self.handles_opened.get() + 1);
        handle
    }

    fn release(&self, handle: RawHandle, store: bool) {
        let mut state = self.state.borrow_mut();
        let matches = match state.live.get(&handle) {
            Some(MemObject::Cert(_)) => !store,
            Some(_) => store,
            None => false,
        };
        if matches {
            if let Some(MemObject::Collection(id)) = state.live.remove(&handle) {
                state.collections.remove(&id);
            }
        } else {
            debug!("Release of handle {handle:?} that is not live");
            self.double_releases.set(self.double_releases.get() + 1);
        }
    }

    fn cert_entry(&self, cert: RawHandle) -> Option<MemCertEntry> {
        match self.state.borrow().live.get(&cert) {
            Some(MemObject::Cert(entry)) => Some(entry.clone()),
            _ => None,
        }
    }

    /// Returns a new certificate context referencing a copy of `entry`
    fn context_for(&self, entry: MemCertEntry) -> RawHandle {
        self.allocate(MemObject::Cert(entry))
    }
}

impl ReleaseHandle for MemCertStore {
    fn close_store(&self, handle: RawHandle) {
        self.release(handle, true);
    }

    fn free_cert_context(&self, handle: RawHandle) {
        self.release(handle, false);
    }
}

impl CertStoreProvider for MemCertStore {
    fn open_collection(&self) -> Result<RawHandle> {
        if self.fail_collection_open.get() {
            return Err(Error::StoreOpen(PlatformFailure::new(
                "CertOpenStore",
                INJECTED_FAILURE,
            )));
        }
        let id = {
            let mut state = self.state.borrow_mut();
            state.next_collection += 1;
            let id = state.next_collection;
            state.collections.insert(id, vec![]);
            id
        };
        Ok(self.allocate(MemObject::Collection(id)))
    }

    fn open_reference_store(&self, name: &str) -> Result<RawHandle> {
        if self.fail_reference_open.get() {
            return Err(Error::StoreOpen(PlatformFailure::new(
                "CertOpenStore",
                INJECTED_FAILURE,
            )));
        }
        Ok(self.allocate(MemObject::Store(name.to_string())))
    }

    fn create_cert_context(&self, der_cert: &[u8]) -> Result<RawHandle> {
        let pc = match ParsedCertificate::from_der(der_cert.to_vec()) {
            Ok(pc) => pc,
            Err(_) => {
                return Err(Error::CertContext(PlatformFailure::new(
                    "CertCreateCertificateContext",
                    BAD_CERT_ENCODING,
                )))
            }
        };
        Ok(self.context_for(MemCertEntry {
            der: der_cert.to_vec(),
            identity: pc.identity().clone(),
            key_provider: None,
        }))
    }

    fn find_by_identity(&self, store: RawHandle, id: &CertIdentity) -> Result<Option<RawHandle>> {
        if self.fail_reference_search.get() {
            return Err(Error::ResolveAdd(PlatformFailure::new(
                "CertFindCertificateInStore",
                INJECTED_FAILURE,
            )));
        }
        let found = {
            let state = self.state.borrow();
            let entries = match state.live.get(&store) {
                Some(MemObject::Store(name)) => state.durable.get(name),
                Some(MemObject::Collection(c)) => state.collections.get(c),
                _ => {
                    return Err(Error::ResolveAdd(PlatformFailure::new(
                        "CertFindCertificateInStore",
                        INVALID_HANDLE,
                    )))
                }
            };
            entries.and_then(|entries| entries.iter().find(|e| &e.identity == id).cloned())
        };
        Ok(found.map(|entry| self.context_for(entry)))
    }

    fn add_cert_context(&self, store: RawHandle, cert: RawHandle) -> Result<()> {
        let add_failure = |status| {
            Error::ResolveAdd(PlatformFailure::new(
                "CertAddCertificateContextToStore",
                status,
            ))
        };
        let entry = self.cert_entry(cert).ok_or(add_failure(INVALID_HANDLE))?;

        let mut state = self.state.borrow_mut();
        if state.fail_add.contains(&entry.der) {
            return Err(add_failure(INJECTED_FAILURE));
        }
        let target = match state.live.get(&store) {
            Some(MemObject::Collection(id)) => *id,
            _ => return Err(add_failure(INVALID_HANDLE)),
        };
        if let Some(entries) = state.collections.get_mut(&target) {
            entries.push(entry);
        }
        Ok(())
    }

    fn encoded_cert(&self, cert: RawHandle) -> Result<Vec<u8>> {
        match self.cert_entry(cert) {
            Some(entry) => Ok(entry.der),
            None => Err(Error::CertContext(PlatformFailure::new(
                "CertGetCertificateContextProperty",
                INVALID_HANDLE,
            ))),
        }
    }
}

/// What a [ScriptedPicker] does when shown
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PickerScript {
    /// Choose the entry at the given position in the presented collection. Choosing a position past
    /// the end behaves like cancel.
    Choose(usize),
    /// Dismiss the picker without choosing
    Cancel,
    /// Fail to display the picker
    Fail,
}

/// Picker that follows a script and records what it was shown
#[derive(Debug)]
pub struct ScriptedPicker<'a> {
    store: &'a MemCertStore,
    script: PickerScript,
    calls: Cell<usize>,
    presented: RefCell<Vec<MemCertEntry>>,
    prompt: RefCell<Option<PickerPrompt>>,
}

impl<'a> ScriptedPicker<'a> {
    /// Creates a picker that presents collections opened via `store`
    pub fn new(store: &'a MemCertStore, script: PickerScript) -> Self {
        ScriptedPicker {
            store,
            script,
            calls: Cell::new(0),
            presented: RefCell::new(vec![]),
            prompt: RefCell::new(None),
        }
    }

    /// Returns the number of times the picker was shown
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Returns the entries presented the last time the picker was shown
    pub fn presented(&self) -> Vec<MemCertEntry> {
        self.presented.borrow().clone()
    }

    /// Returns the prompt used the last time the picker was shown
    pub fn prompt(&self) -> Option<PickerPrompt> {
        self.prompt.borrow().clone()
    }
}

impl CertPicker for ScriptedPicker<'_> {
    fn pick(&self, collection: RawHandle, prompt: &PickerPrompt) -> Result<Option<RawHandle>> {
        self.calls.set(self.calls.get() + 1);
        *self.prompt.borrow_mut() = Some(prompt.clone());
        if self.script == PickerScript::Fail {
            return Err(Error::PickerInvocation(PlatformFailure::new(
                "CryptUIDlgSelectCertificateFromStore",
                INJECTED_FAILURE,
            )));
        }

        let entries = self.store.collection_entries(collection);
        *self.presented.borrow_mut() = entries.clone();
        match self.script {
            PickerScript::Choose(pos) => Ok(entries
                .get(pos)
                .cloned()
                .map(|entry| self.store.context_for(entry))),
            _ => Ok(None),
        }
    }
}
