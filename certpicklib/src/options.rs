//! Options governing a selection session

use serde::{Deserialize, Serialize};

use crate::provider::PickerPrompt;

/// Name of the current user's personal certificate store
pub const DEFAULT_REFERENCE_STORE: &str = "MY";

/// Options governing a selection session. Missing fields take default values when deserialized.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectOptions {
    /// Logical name of the durable store consulted when resolving candidates
    pub reference_store: String,
    /// Picker window title
    pub title: Option<String>,
    /// Text displayed above the list of certificates
    pub display_string: Option<String>,
    /// Return [Error::NoDecodableCandidates](crate::Error::NoDecodableCandidates) instead of presenting
    /// an empty picker when candidates were supplied but none could be decoded
    pub fail_when_nothing_decodes: bool,
    /// Return no selection without presenting the picker when the collection is empty
    pub skip_picker_when_empty: bool,
    /// Owner window for the picker. Not persisted.
    #[serde(skip)]
    pub owner_window: Option<isize>,
}

impl Default for SelectOptions {
    fn default() -> Self {
        SelectOptions {
            reference_store: DEFAULT_REFERENCE_STORE.to_string(),
            title: None,
            display_string: None,
            fail_when_nothing_decodes: false,
            skip_picker_when_empty: false,
            owner_window: None,
        }
    }
}

impl SelectOptions {
    /// Returns the picker-related portion of the options
    pub fn prompt(&self) -> PickerPrompt {
        PickerPrompt {
            title: self.title.clone(),
            display_string: self.display_string.clone(),
            owner_window: self.owner_window,
        }
    }
}

#[test]
fn partial_json_takes_defaults() {
    let opts: SelectOptions = serde_json::from_str(r#"{"title": "Choose"}"#).unwrap();
    assert_eq!(opts.reference_store, "MY");
    assert_eq!(opts.title.as_deref(), Some("Choose"));
    assert!(!opts.fail_when_nothing_decodes);
    assert!(!opts.skip_picker_when_empty);
}

#[test]
fn owner_window_is_not_persisted() {
    let opts = SelectOptions {
        owner_window: Some(42),
        ..Default::default()
    };
    let json = serde_json::to_string(&opts).unwrap();
    assert!(!json.contains("owner_window"));
    let read: SelectOptions = serde_json::from_str(&json).unwrap();
    assert_eq!(read.owner_window, None);
}
