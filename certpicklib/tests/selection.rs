use std::sync::Once;

use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

use certpicklib::{
    decode_certificate_text,
    mem_store::{MemCertStore, PickerScript, ScriptedPicker},
    CandidateStatus, Error, ResolvedFrom, SelectOptions, Selection, SelectionSession,
    NO_SELECTION,
};

const ALPHA: &str = include_str!("data/alpha.pem");
const BRAVO: &str = include_str!("data/bravo.pem");
const DUP_FIRST: &str = include_str!("data/dup_first.pem");
const DUP_SECOND: &str = include_str!("data/dup_second.pem");

static LOGGING: Once = Once::new();

fn init_logging() {
    LOGGING.call_once(|| {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{l} {m}{n}")))
            .build();
        if let Ok(config) = Config::builder()
            .appender(Appender::builder().build("stdout", Box::new(stdout)))
            .build(Root::builder().appender("stdout").build(LevelFilter::Debug))
        {
            let _ = log4rs::init_config(config);
        }
    });
}

fn run(
    store: &MemCertStore,
    script: PickerScript,
    candidates: &[&str],
) -> (certpicklib::Result<certpicklib::SelectionOutcome>, usize) {
    init_logging();
    let picker = ScriptedPicker::new(store, script);
    let options = SelectOptions::default();
    let session = SelectionSession::new(store, &picker, &options);
    let outcome = session.select(candidates);
    (outcome, picker.calls())
}

#[test]
fn scenario_a_picks_second_candidate() {
    let store = MemCertStore::new();
    let (outcome, calls) = run(&store, PickerScript::Choose(1), &[ALPHA, BRAVO]);
    let outcome = outcome.unwrap();
    assert_eq!(outcome.selection, Selection::Index(1));
    assert_eq!(outcome.selection.as_index(), 1);
    assert_eq!(calls, 1);
}

#[test]
fn presented_order_matches_input_order() {
    init_logging();
    let store = MemCertStore::new();
    let picker = ScriptedPicker::new(&store, PickerScript::Cancel);
    let options = SelectOptions::default();
    let session = SelectionSession::new(&store, &picker, &options);
    session.select(&[ALPHA, BRAVO]).unwrap();

    let presented = picker.presented();
    assert_eq!(presented.len(), 2);
    assert_eq!(presented[0].der, decode_certificate_text(ALPHA).unwrap().der());
    assert_eq!(presented[1].der, decode_certificate_text(BRAVO).unwrap().der());
}

#[test]
fn each_presented_position_maps_to_its_input_index() {
    let inputs = [BRAVO, ALPHA, DUP_FIRST];
    for n in 0..inputs.len() {
        let store = MemCertStore::new();
        let (outcome, _) = run(&store, PickerScript::Choose(n), &inputs);
        assert_eq!(outcome.unwrap().selection, Selection::Index(n));
    }
}

#[test]
fn cancel_is_no_selection() {
    let store = MemCertStore::new();
    let (outcome, calls) = run(&store, PickerScript::Cancel, &[ALPHA, BRAVO]);
    let outcome = outcome.unwrap();
    assert_eq!(outcome.selection, Selection::NoSelection);
    assert_eq!(outcome.selection.as_index(), NO_SELECTION);
    assert_eq!(calls, 1);
}

#[test]
fn scenario_b_garbage_is_no_selection() {
    let store = MemCertStore::new();
    let (outcome, calls) = run(&store, PickerScript::Choose(0), &["garbage"]);
    let outcome = outcome.unwrap();
    assert_eq!(outcome.selection, Selection::NoSelection);
    assert!(matches!(
        outcome.candidates[0],
        CandidateStatus::DecodeFailed(Error::Decode(_))
    ));
    assert_eq!(outcome.offered(), 0);
    assert_eq!(calls, 1);
}

#[test]
fn garbage_can_be_reported_as_error() {
    init_logging();
    let store = MemCertStore::new();
    let picker = ScriptedPicker::new(&store, PickerScript::Choose(0));
    let options = SelectOptions {
        fail_when_nothing_decodes: true,
        ..Default::default()
    };
    let session = SelectionSession::new(&store, &picker, &options);
    assert_eq!(
        session.select(&["garbage", ""]),
        Err(Error::NoDecodableCandidates)
    );
    assert_eq!(picker.calls(), 0);
    assert_eq!(store.live_handles(), 0);
}

#[test]
fn empty_collection_can_skip_picker() {
    init_logging();
    let store = MemCertStore::new();
    let picker = ScriptedPicker::new(&store, PickerScript::Choose(0));
    let options = SelectOptions {
        skip_picker_when_empty: true,
        ..Default::default()
    };
    let session = SelectionSession::new(&store, &picker, &options);
    let outcome = session.select(&["garbage"]).unwrap();
    assert_eq!(outcome.selection, Selection::NoSelection);
    assert_eq!(picker.calls(), 0);
}

#[test]
fn empty_candidate_list_is_no_selection() {
    let store = MemCertStore::new();
    let (outcome, _) = run(&store, PickerScript::Choose(0), &[]);
    let outcome = outcome.unwrap();
    assert_eq!(outcome.selection, Selection::NoSelection);
    assert!(outcome.candidates.is_empty());
}

#[test]
fn malformed_entry_does_not_shift_indices() {
    let store = MemCertStore::new();
    let (outcome, _) = run(
        &store,
        PickerScript::Choose(1),
        &[ALPHA, "-----BEGIN CERTIFICATE-----\nMIIB", BRAVO],
    );
    let outcome = outcome.unwrap();
    assert_eq!(outcome.selection, Selection::Index(2));
    assert_eq!(
        outcome.candidates[1],
        CandidateStatus::DecodeFailed(Error::MalformedInput)
    );
    assert_eq!(outcome.offered(), 2);
}

#[test]
fn unparseable_entry_is_excluded() {
    let store = MemCertStore::new();
    // valid base64, not a certificate
    let (outcome, _) = run(&store, PickerScript::Choose(0), &["AAECAwQF", BRAVO]);
    let outcome = outcome.unwrap();
    assert!(matches!(
        outcome.candidates[0],
        CandidateStatus::DecodeFailed(Error::Parse(_))
    ));
    assert_eq!(outcome.selection, Selection::Index(1));
}

#[test]
fn scenario_c_store_entry_is_offered_and_maps_to_candidate() {
    init_logging();
    let store = MemCertStore::new();
    let alpha = decode_certificate_text(ALPHA).unwrap();
    store
        .add_to_reference_store("MY", alpha.der(), Some("Microsoft Software Key Storage Provider"))
        .unwrap();

    let picker = ScriptedPicker::new(&store, PickerScript::Choose(0));
    let options = SelectOptions::default();
    let session = SelectionSession::new(&store, &picker, &options);
    let outcome = session.select(&[ALPHA]).unwrap();

    assert_eq!(
        outcome.candidates,
        vec![CandidateStatus::Offered(ResolvedFrom::ReferenceStore)]
    );
    let presented = picker.presented();
    assert_eq!(presented.len(), 1);
    assert_eq!(
        presented[0].key_provider.as_deref(),
        Some("Microsoft Software Key Storage Provider")
    );
    assert_eq!(outcome.selection, Selection::Index(0));
}

#[test]
fn reference_store_name_comes_from_options() {
    init_logging();
    let store = MemCertStore::new();
    let alpha = decode_certificate_text(ALPHA).unwrap();
    store
        .add_to_reference_store("CA", alpha.der(), Some("CA store"))
        .unwrap();

    let picker = ScriptedPicker::new(&store, PickerScript::Cancel);
    let my = SelectOptions::default();
    let outcome = SelectionSession::new(&store, &picker, &my)
        .select(&[ALPHA])
        .unwrap();
    assert_eq!(
        outcome.candidates[0],
        CandidateStatus::Offered(ResolvedFrom::Candidate)
    );

    let ca = SelectOptions {
        reference_store: "CA".to_string(),
        ..Default::default()
    };
    let outcome = SelectionSession::new(&store, &picker, &ca)
        .select(&[ALPHA])
        .unwrap();
    assert_eq!(
        outcome.candidates[0],
        CandidateStatus::Offered(ResolvedFrom::ReferenceStore)
    );
}

#[test]
fn stand_in_with_different_content_is_no_selection() {
    init_logging();
    let store = MemCertStore::new();
    // the durable copy shares issuer and serial number with the candidate but not its content
    let second = decode_certificate_text(DUP_SECOND).unwrap();
    store.add_to_reference_store("MY", second.der(), None).unwrap();

    let picker = ScriptedPicker::new(&store, PickerScript::Choose(0));
    let options = SelectOptions::default();
    let outcome = SelectionSession::new(&store, &picker, &options)
        .select(&[DUP_FIRST])
        .unwrap();
    assert_eq!(
        outcome.candidates[0],
        CandidateStatus::Offered(ResolvedFrom::ReferenceStore)
    );
    assert_eq!(outcome.selection, Selection::NoSelection);
}

#[test]
fn duplicate_identities_favor_first_listed() {
    let store = MemCertStore::new();
    let picker = ScriptedPicker::new(&store, PickerScript::Choose(0));
    let options = SelectOptions::default();
    let outcome = SelectionSession::new(&store, &picker, &options)
        .select(&[DUP_SECOND, DUP_FIRST])
        .unwrap();

    let presented = picker.presented();
    assert_eq!(presented.len(), 1);
    assert_eq!(presented[0].der, decode_certificate_text(DUP_SECOND).unwrap().der());
    assert_eq!(outcome.selection, Selection::Index(0));
}

#[test]
fn distinct_identities_absent_from_store_are_both_offered() {
    let store = MemCertStore::new();
    let picker = ScriptedPicker::new(&store, PickerScript::Cancel);
    let options = SelectOptions::default();
    let outcome = SelectionSession::new(&store, &picker, &options)
        .select(&[ALPHA, BRAVO])
        .unwrap();
    assert_eq!(outcome.offered(), 2);
    assert_eq!(picker.presented().len(), 2);
}

#[test]
fn repeated_candidate_maps_to_first_occurrence() {
    let store = MemCertStore::new();
    let (outcome, _) = run(&store, PickerScript::Choose(0), &[BRAVO, ALPHA, ALPHA]);
    let outcome = outcome.unwrap();
    // identical entries collapse to one in the collection; ALPHA is presented second
    let (again, _) = run(&store, PickerScript::Choose(1), &[BRAVO, ALPHA, ALPHA]);
    assert_eq!(outcome.selection, Selection::Index(0));
    assert_eq!(again.unwrap().selection, Selection::Index(1));
}

#[test]
fn prompt_is_passed_to_picker() {
    init_logging();
    let store = MemCertStore::new();
    let picker = ScriptedPicker::new(&store, PickerScript::Cancel);
    let options = SelectOptions {
        title: Some("Client certificate".to_string()),
        display_string: Some("Select a certificate for example.com".to_string()),
        owner_window: Some(0x1234),
        ..Default::default()
    };
    SelectionSession::new(&store, &picker, &options)
        .select(&[ALPHA])
        .unwrap();
    let prompt = picker.prompt().unwrap();
    assert_eq!(prompt.title.as_deref(), Some("Client certificate"));
    assert_eq!(
        prompt.display_string.as_deref(),
        Some("Select a certificate for example.com")
    );
    assert_eq!(prompt.owner_window, Some(0x1234));
}

#[test]
fn reference_search_failure_falls_back_to_candidate() {
    init_logging();
    let store = MemCertStore::new();
    store.fail_reference_search();
    let (outcome, _) = run(&store, PickerScript::Choose(0), &[ALPHA]);
    let outcome = outcome.unwrap();
    assert_eq!(
        outcome.candidates[0],
        CandidateStatus::Offered(ResolvedFrom::Candidate)
    );
    assert_eq!(outcome.selection, Selection::Index(0));
}
