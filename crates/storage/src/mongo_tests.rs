// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filter construction tests. The store itself is exercised against the
//! in-memory implementation, which shares the CAS and pagination
//! semantics; these tests pin the query documents sent to the driver.

use super::*;
use poiesis_core::View;

#[test]
fn filter_always_scopes_on_user() {
    let filter = list_filter(&ListQuery::for_user("alice"));
    assert_eq!(filter.get_str("user_id").unwrap(), "alice");
}

#[test]
fn name_prefix_becomes_anchored_regex() {
    let query = ListQuery {
        name_prefix: Some("build.v2-".to_string()),
        ..ListQuery::for_user("alice")
    };
    let filter = list_filter(&query);
    let Bson::RegularExpression(regex) = filter.get("name").unwrap() else {
        panic!("expected a regex filter");
    };
    assert_eq!(regex.pattern, r"^build\.v2\-");
}

#[test]
fn state_filter_uses_wire_name() {
    let query = ListQuery {
        state: Some(TaskState::ExecutorError),
        ..ListQuery::for_user("alice")
    };
    assert_eq!(list_filter(&query).get_str("state").unwrap(), "EXECUTOR_ERROR");
}

#[test]
fn tag_filters_exact_and_exists() {
    let query = ListQuery {
        tags: vec![
            ("team".to_string(), "genomics".to_string()),
            ("pipeline".to_string(), String::new()),
        ],
        ..ListQuery::for_user("alice")
    };
    let filter = list_filter(&query);
    assert_eq!(filter.get_str("tags.team").unwrap(), "genomics");
    assert!(filter.get_document("tags.pipeline").unwrap().get_bool("$exists").unwrap());
}

#[test]
fn page_token_resumes_after_position() {
    let query = ListQuery {
        page_token: Some("2026-01-01T00:00:00.000Z~tsk-abc".to_string()),
        view: View::Minimal,
        ..ListQuery::for_user("alice")
    };
    let filter = list_filter(&query);
    let or = filter.get_array("$or").unwrap();
    assert_eq!(or.len(), 2);
}

#[test]
fn malformed_page_token_is_ignored() {
    let query = ListQuery {
        page_token: Some("not-a-token".to_string()),
        ..ListQuery::for_user("alice")
    };
    assert!(list_filter(&query).get("$or").is_none());
}

#[yare::parameterized(
    plain   = { "abc123", "abc123" },
    dots    = { "a.b", r"a\.b" },
    anchors = { "^a$", r"\^a\$" },
)]
fn regex_escaping(input: &str, expected: &str) {
    assert_eq!(escape_regex(input), expected);
}
