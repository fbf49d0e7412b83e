mod common;

use common::sample_config;
use docs_build_core::filter::{Dimension, FilterError, FilterState, WILDCARD};

#[test]
fn new_state_is_all_wildcards() {
    let state = FilterState::new();
    for dim in Dimension::ALL {
        assert_eq!(state.get(dim), WILDCARD, "{dim} should start as *");
    }
    assert!(!state.has_name_filter());
    assert_eq!(state.last_action(), None);
}

#[test]
fn set_filter_accepts_configured_values_and_wildcard() {
    let config = sample_config();
    let mut state = FilterState::new();

    state.set_filter(&config, Dimension::Language, "de").unwrap();
    state.set_filter(&config, Dimension::Version, "v256").unwrap();
    state.set_filter(&config, Dimension::Scope, "ui").unwrap();
    assert_eq!(state.language(), "de");
    assert_eq!(state.version(), "v256");
    assert_eq!(state.scope(), "ui");

    state.set_filter(&config, Dimension::Scope, "*").unwrap();
    assert_eq!(state.scope(), "*");
}

#[test]
fn set_filter_rejects_unknown_values_and_keeps_state() {
    let config = sample_config();
    let mut state = FilterState::new();
    state.set_filter(&config, Dimension::Language, "fr").unwrap();
    let before = state.clone();

    let cases = [
        (Dimension::Language, "es"),
        (Dimension::Language, "English"),
        (Dimension::Version, "v999"),
        (Dimension::Scope, "Reference"),
        (Dimension::Scope, ""),
    ];
    for (dim, value) in cases {
        let err = state.set_filter(&config, dim, value).unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidFilterValue {
                dimension: dim,
                value: value.to_string()
            }
        );
        assert_eq!(state, before, "state must not change after rejecting {value:?}");
    }
}

#[test]
fn name_pattern_is_validated_and_previous_value_retained() {
    let mut state = FilterState::new();
    state.set_name_pattern("Create.*").unwrap();
    assert_eq!(state.name(), "Create.*");
    assert!(state.has_name_filter());

    for bad in ["Create(", "[a-", "*Button", "a{2,1}", ""] {
        let err = state.set_name_pattern(bad).unwrap_err();
        assert!(
            matches!(err, FilterError::InvalidPattern { .. }),
            "expected InvalidPattern for {bad:?}, got {err:?}"
        );
        assert_eq!(state.name(), "Create.*", "name must be retained after {bad:?}");
    }
}

#[test]
fn wildcard_clears_the_name_filter() {
    let config = sample_config();
    let mut state = FilterState::new();
    state.set_name_pattern("^Add").unwrap();
    state.set_filter(&config, Dimension::Name, "*").unwrap();
    assert!(!state.has_name_filter());
    assert!(state.name_regex().is_none());
}

#[test]
fn name_regex_matches_entries() {
    let mut state = FilterState::new();
    state.set_name_pattern("^Create(Button|Text)$").unwrap();
    let re = state.name_regex().expect("name filter compiled");
    assert!(re.is_match("CreateButton"));
    assert!(!re.is_match("CreateImage"));
}

#[test]
fn describe_is_a_stable_four_line_summary() {
    let config = sample_config();
    let mut state = FilterState::new();
    state.set_filter(&config, Dimension::Language, "en").unwrap();
    state.set_name_pattern("Create.*").unwrap();

    let expected = "language: en\nversion: *\nscope: *\nname: Create.*";
    assert_eq!(state.describe(), expected);
    assert_eq!(state.describe(), expected);
}

#[test]
fn apply_target_is_all_or_nothing() {
    let config = sample_config();
    let mut state = FilterState::new();

    state.apply_target(&config, "de.ui.Create.*").unwrap();
    assert_eq!(state.language(), "de");
    assert_eq!(state.scope(), "ui");
    assert_eq!(state.name(), "Create.*");

    let before = state.clone();
    assert!(state.apply_target(&config, "en.nope.Button").is_err());
    assert_eq!(state, before);
    assert!(state.apply_target(&config, "en.app.(").is_err());
    assert_eq!(state, before);
}

#[test]
fn reset_restores_wildcards_and_keeps_last_action() {
    let config = sample_config();
    let mut state = FilterState::new();
    state.set_filter(&config, Dimension::Scope, "app").unwrap();
    state.set_last_action("update");
    state.reset();
    assert_eq!(state.scope(), "*");
    assert_eq!(state.last_action(), Some("update"));
}

#[test]
fn choices_list_tables_then_all() {
    let config = sample_config();
    assert_eq!(
        FilterState::choices(&config, Dimension::Language),
        vec!["en (English)", "de (Deutsch)", "fr (Francais)", "* (all)"]
    );
    assert_eq!(
        FilterState::choices(&config, Dimension::Version),
        vec!["v257", "v256", "* (all)"]
    );
    assert_eq!(FilterState::parse_choice("ui (UI Components)"), "ui");
    assert_eq!(FilterState::parse_choice("* (all)"), "*");
}
