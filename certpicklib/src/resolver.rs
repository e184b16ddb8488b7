//! Resolves candidates against the reference store before adding them to the disposable collection
//!
//! When the reference store holds a certificate with the same issuer and serial number as a candidate,
//! the store's entry is added to the collection instead of the candidate so that any private key or
//! trust information associated with the durable copy is available to the picker.
//!
//! Callers must resolve candidates in reverse of their original order. The collection exposes the most
//! recently added entry when identities collide, so reverse insertion gives precedence to the candidate
//! listed first.

use log::{debug, warn};

use crate::{
    decoder::ParsedCertificate,
    handle::ScopedHandle,
    provider::CertStoreProvider,
    selection::ResolvedFrom,
    Result,
};

/// Adds either the matching reference store entry or `candidate_ctx` to `collection`.
///
/// A failed search of the reference store is logged and treated as no match. Failure to add to the
/// collection is returned to the caller.
pub fn resolve_and_add<S: CertStoreProvider>(
    provider: &S,
    reference_store: &ScopedHandle<'_, S>,
    collection: &ScopedHandle<'_, S>,
    candidate: &ParsedCertificate,
    candidate_ctx: &ScopedHandle<'_, S>,
) -> Result<ResolvedFrom> {
    let found = match provider.find_by_identity(reference_store.get(), candidate.identity()) {
        Ok(found) => found,
        Err(e) => {
            warn!(
                "Failed to search reference store for {}: {e:?}. Using candidate as supplied.",
                candidate.subject()
            );
            None
        }
    };

    let stand_in = found
        .map(|raw| ScopedHandle::cert_context(raw, provider))
        .filter(|h| h.is_valid());

    match stand_in {
        Some(stand_in) => {
            debug!(
                "Using reference store entry for {} ({})",
                candidate.subject(),
                candidate.thumbprint()
            );
            provider.add_cert_context(collection.get(), stand_in.get())?;
            Ok(ResolvedFrom::ReferenceStore)
        }
        None => {
            debug!(
                "No reference store entry for {} ({})",
                candidate.subject(),
                candidate.thumbprint()
            );
            provider.add_cert_context(collection.get(), candidate_ctx.get())?;
            Ok(ResolvedFrom::Candidate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decoder::decode_certificate_text, mem_store::MemCertStore, Error};

    const ALPHA: &str = include_str!("../tests/data/alpha.pem");
    const DUP_FIRST: &str = include_str!("../tests/data/dup_first.pem");
    const DUP_SECOND: &str = include_str!("../tests/data/dup_second.pem");

    fn open<'a>(
        store: &'a MemCertStore,
    ) -> (ScopedHandle<'a, MemCertStore>, ScopedHandle<'a, MemCertStore>) {
        let reference = ScopedHandle::store(store.open_reference_store("MY").unwrap(), store);
        let collection = ScopedHandle::store(store.open_collection().unwrap(), store);
        (reference, collection)
    }

    #[test]
    fn uses_candidate_when_not_in_store() {
        let store = MemCertStore::new();
        {
            let (reference, collection) = open(&store);
            let pc = decode_certificate_text(ALPHA).unwrap();
            let ctx = ScopedHandle::cert_context(store.create_cert_context(pc.der()).unwrap(), &store);
            let from = resolve_and_add(&store, &reference, &collection, &pc, &ctx).unwrap();
            assert_eq!(from, ResolvedFrom::Candidate);
            let entries = store.collection_entries(collection.get());
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].der, pc.der());
            assert_eq!(entries[0].key_provider, None);
        }
        assert_eq!(store.live_handles(), 0);
    }

    #[test]
    fn prefers_store_entry() {
        let store = MemCertStore::new();
        let pc = decode_certificate_text(ALPHA).unwrap();
        store
            .add_to_reference_store("MY", pc.der(), Some("Smart Card Key Storage Provider"))
            .unwrap();
        {
            let (reference, collection) = open(&store);
            let ctx = ScopedHandle::cert_context(store.create_cert_context(pc.der()).unwrap(), &store);
            let from = resolve_and_add(&store, &reference, &collection, &pc, &ctx).unwrap();
            assert_eq!(from, ResolvedFrom::ReferenceStore);
            let entries = store.collection_entries(collection.get());
            assert_eq!(entries.len(), 1);
            assert_eq!(
                entries[0].key_provider.as_deref(),
                Some("Smart Card Key Storage Provider")
            );
        }
        assert_eq!(store.live_handles(), 0);
        assert_eq!(store.double_releases(), 0);
    }

    #[test]
    fn reverse_insertion_favors_first_candidate() {
        let store = MemCertStore::new();
        let first = decode_certificate_text(DUP_FIRST).unwrap();
        let second = decode_certificate_text(DUP_SECOND).unwrap();
        {
            let (reference, collection) = open(&store);
            let first_ctx =
                ScopedHandle::cert_context(store.create_cert_context(first.der()).unwrap(), &store);
            let second_ctx =
                ScopedHandle::cert_context(store.create_cert_context(second.der()).unwrap(), &store);
            resolve_and_add(&store, &reference, &collection, &second, &second_ctx).unwrap();
            resolve_and_add(&store, &reference, &collection, &first, &first_ctx).unwrap();
            let visible = store.collection_entries(collection.get());
            assert_eq!(visible.len(), 1);
            assert_eq!(visible[0].der, first.der());
        }
        assert_eq!(store.live_handles(), 0);
    }

    #[test]
    fn add_failure_is_reported() {
        let store = MemCertStore::new();
        let pc = decode_certificate_text(ALPHA).unwrap();
        store.fail_add_for(pc.der());
        {
            let (reference, collection) = open(&store);
            let ctx = ScopedHandle::cert_context(store.create_cert_context(pc.der()).unwrap(), &store);
            let r = resolve_and_add(&store, &reference, &collection, &pc, &ctx);
            assert!(matches!(r, Err(Error::ResolveAdd(_))));
            assert!(store.collection_entries(collection.get()).is_empty());
        }
        assert_eq!(store.live_handles(), 0);
    }
}
