//! Provides a wrapper for opaque platform handles (certificate stores and certificate contexts) that
//! ensures each handle is released exactly once when no longer used.
//!
//! The release primitive is chosen by the [HandleKind] supplied when the wrapper is created. The
//! object that performs the release is whatever implements [ReleaseHandle], i.e., the CAPI-backed
//! store on Windows or the instrumented in-memory store used in tests.

use std::fmt;

/// Opaque handle value as returned by the platform
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RawHandle(pub usize);

impl RawHandle {
    /// Zero/null handle value
    pub const NULL: RawHandle = RawHandle(0);
    /// Equivalent of `INVALID_HANDLE_VALUE`
    pub const INVALID: RawHandle = RawHandle(usize::MAX);

    /// Returns true if the handle is neither null nor the invalid sentinel
    pub fn is_valid(&self) -> bool {
        *self != Self::NULL && *self != Self::INVALID
    }

    /// Wraps a pointer returned by a platform function
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        RawHandle(ptr as usize)
    }

    /// Returns the handle value as a pointer
    pub fn as_ptr<T>(&self) -> *const T {
        self.0 as *const T
    }
}

/// The closed set of handle kinds, each of which is released by a different primitive
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HandleKind {
    /// Certificate store (released via `CertCloseStore`)
    Store,
    /// Certificate context (released via `CertFreeCertificateContext`)
    CertContext,
}

/// Release primitives for each [HandleKind]
pub trait ReleaseHandle {
    /// Closes a certificate store handle
    fn close_store(&self, handle: RawHandle);
    /// Frees a certificate context handle
    fn free_cert_context(&self, handle: RawHandle);
}

/// Owns exactly one platform handle and releases it when dropped.
///
/// ScopedHandle is not `Clone`. Moving a ScopedHandle transfers ownership; use [ScopedHandle::into_raw]
/// to take the handle out without releasing it.
pub struct ScopedHandle<'r, R: ReleaseHandle + ?Sized> {
    raw: RawHandle,
    kind: HandleKind,
    releaser: &'r R,
}

impl<'r, R: ReleaseHandle + ?Sized> ScopedHandle<'r, R> {
    /// Takes ownership of `raw`, which will be released via the primitive associated with `kind`
    pub fn new(raw: RawHandle, kind: HandleKind, releaser: &'r R) -> Self {
        ScopedHandle {
            raw,
            kind,
            releaser,
        }
    }

    /// Takes ownership of a certificate store handle
    pub fn store(raw: RawHandle, releaser: &'r R) -> Self {
        Self::new(raw, HandleKind::Store, releaser)
    }

    /// Takes ownership of a certificate context handle
    pub fn cert_context(raw: RawHandle, releaser: &'r R) -> Self {
        Self::new(raw, HandleKind::CertContext, releaser)
    }

    /// Returns true if the wrapped handle has not been released and is neither null nor invalid
    pub fn is_valid(&self) -> bool {
        self.raw.is_valid()
    }

    /// Returns the wrapped handle value. The caller must not release it.
    pub fn get(&self) -> RawHandle {
        self.raw
    }

    /// Returns the kind of handle that is wrapped
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Releases the wrapped handle. Calling release on an already released (or never valid) handle
    /// does nothing.
    pub fn release(&mut self) {
        if self.raw.is_valid() {
            match self.kind {
                HandleKind::Store => self.releaser.close_store(self.raw),
                HandleKind::CertContext => self.releaser.free_cert_context(self.raw),
            }
            self.raw = RawHandle::INVALID;
        }
    }

    /// Gives up ownership of the wrapped handle without releasing it
    pub fn into_raw(mut self) -> RawHandle {
        let raw = self.raw;
        self.raw = RawHandle::INVALID;
        raw
    }
}

impl<R: ReleaseHandle + ?Sized> Drop for ScopedHandle<'_, R> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<R: ReleaseHandle + ?Sized> fmt::Debug for ScopedHandle<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedHandle")
            .field("raw", &self.raw)
            .field("kind", &self.kind)
            .finish()
    }
}
