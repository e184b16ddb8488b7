//! CAPI certificate store support

#![cfg(target_os = "windows")]

use std::ffi::{c_void, CString};

use log::{debug, error};

use windows::Win32::Security::Cryptography::{
    CertAddCertificateContextToStore, CertCloseStore, CertCreateCertificateContext,
    CertFindCertificateInStore, CertFreeCertificateContext, CertOpenStore, CERT_CONTEXT,
    CERT_FIND_CERT_ID, CERT_ID, CERT_ID_0, CERT_ID_ISSUER_SERIAL_NUMBER, CERT_ISSUER_SERIAL_NUMBER,
    CERT_OPEN_STORE_FLAGS, CERT_QUERY_ENCODING_TYPE, CERT_STORE_ADD_ALWAYS, CERT_STORE_PROV_MEMORY,
    CERT_STORE_PROV_SYSTEM_A, CERT_STORE_READONLY_FLAG, CRYPT_INTEGER_BLOB, HCERTSTORE,
};

use crate::{
    decoder::CertIdentity,
    handle::{RawHandle, ReleaseHandle},
    misc_win::{last_error_status, CERT_ENCODING, CERT_SYSTEM_STORE_CURRENT_USER},
    provider::CertStoreProvider,
    Error, PlatformFailure, Result,
};

/// `ERROR_INVALID_PARAMETER`
const INVALID_PARAMETER: u32 = 87;

fn hcertstore(handle: RawHandle) -> HCERTSTORE {
    HCERTSTORE(handle.0 as isize)
}

/// [CertStoreProvider] backed by CAPI. Reference stores are opened read-only from the current user's
/// system stores; collections are `CERT_STORE_PROV_MEMORY` stores.
#[derive(Copy, Clone, Debug, Default)]
pub struct WinCertStore;

impl ReleaseHandle for WinCertStore {
    fn close_store(&self, handle: RawHandle) {
        unsafe {
            if let Err(e) = CertCloseStore(hcertstore(handle), 0) {
                error!("CertCloseStore failed with {e:?}");
            }
        }
    }

    fn free_cert_context(&self, handle: RawHandle) {
        unsafe {
            let _ = CertFreeCertificateContext(Some(handle.as_ptr::<CERT_CONTEXT>()));
        }
    }
}

impl CertStoreProvider for WinCertStore {
    fn open_collection(&self) -> Result<RawHandle> {
        unsafe {
            match CertOpenStore(
                CERT_STORE_PROV_MEMORY,
                CERT_QUERY_ENCODING_TYPE(0),
                None,
                CERT_OPEN_STORE_FLAGS(0),
                None,
            ) {
                Ok(store) => Ok(RawHandle(store.0 as usize)),
                Err(e) => {
                    error!("CertOpenStore failed to create memory store with {e:?}");
                    Err(Error::StoreOpen(PlatformFailure::new(
                        "CertOpenStore",
                        e.code().0 as u32,
                    )))
                }
            }
        }
    }

    fn open_reference_store(&self, name: &str) -> Result<RawHandle> {
        let store_name = match CString::new(name) {
            Ok(store_name) => store_name,
            Err(e) => {
                error!("Failed to create CString with {name} for CertOpenStore: {e}");
                return Err(Error::StoreOpen(PlatformFailure::new(
                    "CertOpenStore",
                    INVALID_PARAMETER,
                )));
            }
        };
        unsafe {
            match CertOpenStore(
                CERT_STORE_PROV_SYSTEM_A,
                CERT_ENCODING,
                None,
                CERT_STORE_READONLY_FLAG | CERT_SYSTEM_STORE_CURRENT_USER,
                Some(store_name.as_ptr() as *const c_void),
            ) {
                Ok(store) => Ok(RawHandle(store.0 as usize)),
                Err(e) => {
                    error!("CertOpenStore failed to open {name} store with {e:?}");
                    Err(Error::StoreOpen(PlatformFailure::new(
                        "CertOpenStore",
                        e.code().0 as u32,
                    )))
                }
            }
        }
    }

    fn create_cert_context(&self, der_cert: &[u8]) -> Result<RawHandle> {
        unsafe {
            let ctx = CertCreateCertificateContext(CERT_ENCODING, der_cert);
            if ctx.is_null() {
                let status = last_error_status();
                error!("CertCreateCertificateContext failed with {status:#010X}");
                return Err(Error::CertContext(PlatformFailure::new(
                    "CertCreateCertificateContext",
                    status,
                )));
            }
            Ok(RawHandle::from_ptr(ctx))
        }
    }

    fn find_by_identity(&self, store: RawHandle, id: &CertIdentity) -> Result<Option<RawHandle>> {
        // CAPI stores serial numbers little-endian
        let mut issuer = id.issuer.clone();
        let mut serial: Vec<u8> = id.serial.iter().rev().copied().collect();

        let cert_id = CERT_ID {
            dwIdChoice: CERT_ID_ISSUER_SERIAL_NUMBER,
            Anonymous: CERT_ID_0 {
                IssuerSerialNumber: CERT_ISSUER_SERIAL_NUMBER {
                    Issuer: CRYPT_INTEGER_BLOB {
                        cbData: issuer.len() as u32,
                        pbData: issuer.as_mut_ptr(),
                    },
                    SerialNumber: CRYPT_INTEGER_BLOB {
                        cbData: serial.len() as u32,
                        pbData: serial.as_mut_ptr(),
                    },
                },
            },
        };

        unsafe {
            let found = CertFindCertificateInStore(
                hcertstore(store),
                CERT_ENCODING,
                0,
                CERT_FIND_CERT_ID,
                Some(&cert_id as *const CERT_ID as *const c_void),
                None,
            );
            if found.is_null() {
                debug!("CertFindCertificateInStore found no match");
                Ok(None)
            } else {
                Ok(Some(RawHandle::from_ptr(found)))
            }
        }
    }

    fn add_cert_context(&self, store: RawHandle, cert: RawHandle) -> Result<()> {
        unsafe {
            if let Err(e) = CertAddCertificateContextToStore(
                hcertstore(store),
                cert.as_ptr::<CERT_CONTEXT>(),
                CERT_STORE_ADD_ALWAYS,
                None,
            ) {
                error!("CertAddCertificateContextToStore failed with {e:?}");
                return Err(Error::ResolveAdd(PlatformFailure::new(
                    "CertAddCertificateContextToStore",
                    e.code().0 as u32,
                )));
            }
        }
        Ok(())
    }

    fn encoded_cert(&self, cert: RawHandle) -> Result<Vec<u8>> {
        let ctx = cert.as_ptr::<CERT_CONTEXT>();
        if ctx.is_null() {
            return Err(Error::CertContext(PlatformFailure::new(
                "CERT_CONTEXT",
                INVALID_PARAMETER,
            )));
        }
        unsafe {
            let der_cert =
                std::slice::from_raw_parts((*ctx).pbCertEncoded, (*ctx).cbCertEncoded as usize);
            Ok(der_cert.to_vec())
        }
    }
}
