//! Certificate picker backed by `CryptUIDlgSelectCertificateFromStore`

#![cfg(target_os = "windows")]

use std::ptr::null;

use log::{debug, error};

use windows::{
    core::{HSTRING, PCWSTR},
    Win32::{
        Foundation::{
            SetLastError, ERROR_CANCELLED, ERROR_INVALID_HANDLE, ERROR_INVALID_PARAMETER, HWND,
            WIN32_ERROR,
        },
        Security::Cryptography::{UI::CryptUIDlgSelectCertificateFromStore, HCERTSTORE},
    },
};

use crate::{
    handle::RawHandle,
    misc_win::last_error_status,
    provider::{CertPicker, PickerPrompt},
    Error, PlatformFailure, Result,
};

/// [CertPicker] that displays the native certificate selection dialog
#[derive(Copy, Clone, Debug, Default)]
pub struct WinPicker;

fn as_pcwstr(s: &Option<HSTRING>) -> PCWSTR {
    match s {
        Some(s) => PCWSTR::from_raw(s.as_ptr()),
        None => PCWSTR::null(),
    }
}

impl CertPicker for WinPicker {
    fn pick(&self, collection: RawHandle, prompt: &PickerPrompt) -> Result<Option<RawHandle>> {
        if !collection.is_valid() {
            error!("CryptUIDlgSelectCertificateFromStore called with invalid store handle");
            return Err(Error::PickerInvocation(PlatformFailure::new(
                "CryptUIDlgSelectCertificateFromStore",
                ERROR_INVALID_HANDLE.0,
            )));
        }

        let title = prompt.title.as_deref().map(HSTRING::from);
        let display_string = prompt.display_string.as_deref().map(HSTRING::from);

        unsafe {
            SetLastError(WIN32_ERROR(0));
            let selected = CryptUIDlgSelectCertificateFromStore(
                HCERTSTORE(collection.0 as isize),
                HWND(prompt.owner_window.unwrap_or(0)),
                as_pcwstr(&title),
                as_pcwstr(&display_string),
                0,
                0,
                null(),
            );
            if !selected.is_null() {
                return Ok(Some(RawHandle::from_ptr(selected)));
            }
        }

        // a null result covers both cancellation and failure to display the dialog
        let status = last_error_status();
        let invalid_handle = ERROR_INVALID_HANDLE.to_hresult().0 as u32;
        let invalid_parameter = ERROR_INVALID_PARAMETER.to_hresult().0 as u32;
        if status == invalid_handle || status == invalid_parameter {
            error!("CryptUIDlgSelectCertificateFromStore failed with {status:#010X}");
            return Err(Error::PickerInvocation(PlatformFailure::new(
                "CryptUIDlgSelectCertificateFromStore",
                status,
            )));
        }
        if status != 0 && status != ERROR_CANCELLED.to_hresult().0 as u32 {
            debug!("CryptUIDlgSelectCertificateFromStore returned no selection with {status:#010X}");
        }
        Ok(None)
    }
}
