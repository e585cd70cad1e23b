// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const STATE: &str = r#"{
    "version": 4,
    "serial": 7,
    "outputs": {
        "ip": {"value": "10.0.0.1", "type": "string"},
        "count": {"value": 3, "type": "number"}
    }
}"#;

#[test]
fn parse_extracts_serial_and_outputs() {
    let state = State::parse(STATE.as_bytes()).unwrap();
    assert_eq!(state.serial, 7);
    assert_eq!(state.outputs.get("ip").map(String::as_str), Some("10.0.0.1"));
    assert_eq!(state.outputs.get("count").map(String::as_str), Some("3"));
}

#[test]
fn parse_accepts_missing_outputs() {
    let state = State::parse(br#"{"serial": 1}"#).unwrap();
    assert_eq!(state.serial, 1);
    assert!(state.outputs.is_empty());
}

#[test]
fn parse_rejects_malformed_state() {
    assert!(matches!(
        State::parse(b"not json"),
        Err(StateParseError::Malformed(_))
    ));
    // Missing serial is also malformed.
    assert!(State::parse(br#"{"outputs": {}}"#).is_err());
}

#[test]
fn from_secret_reads_payload_key() {
    let mut secret = Secret::default();
    secret
        .data
        .insert(STATE_DATA_KEY.to_string(), STATE.as_bytes().to_vec());
    let state = State::from_secret(&secret).unwrap();
    assert_eq!(state.serial, 7);
}

#[test]
fn from_secret_without_payload_fails() {
    let secret = Secret::default();
    assert!(matches!(
        State::from_secret(&secret),
        Err(StateParseError::MissingPayload)
    ));
}
