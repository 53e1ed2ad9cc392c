use port_core::flatten::{denest, find_least_nested, DenestedRecord};
use serde_json::{json, Value};

fn keys(record: &DenestedRecord) -> Vec<&str> {
    record.keys().map(String::as_str).collect()
}

#[test]
fn denest_joins_map_keys_and_list_indices() {
    let record = denest(&json!({"a": {"b": 1, "c": [2, 3]}}));

    assert_eq!(keys(&record), vec!["a-b", "a-c-0", "a-c-1"]);
    assert_eq!(record["a-b"], json!(1));
    assert_eq!(record["a-c-0"], json!(2));
    assert_eq!(record["a-c-1"], json!(3));
}

#[test]
fn denest_walks_lists_of_objects_in_order() {
    let record = denest(&json!({
        "posts": [
            {"title": "first", "media": [{"uri": "a.jpg", "creation_timestamp": 1700000000}]},
            {"title": "second", "media": []}
        ],
        "owner": null
    }));

    assert_eq!(
        keys(&record),
        vec![
            "posts-0-title",
            "posts-0-media-0-uri",
            "posts-0-media-0-creation_timestamp",
            "posts-1-title",
            "owner",
        ]
    );
    assert_eq!(record["owner"], Value::Null);
}

#[test]
fn every_terminal_value_appears_once() {
    let input = json!([{"x": [1, [2, 3]], "y": {"z": true}}, "tail"]);
    let record = denest(&input);

    assert_eq!(keys(&record), vec!["0-x-0", "0-x-1-0", "0-x-1-1", "0-y-z", "1"]);
    assert_eq!(record["1"], json!("tail"));
}

#[test]
fn scalar_root_is_stored_under_empty_key() {
    let record = denest(&json!(42));
    assert_eq!(keys(&record), vec![""]);
    assert!(denest(&json!({})).is_empty());
}

#[test]
fn colliding_paths_keep_the_last_value() {
    let record = denest(&json!({"a-b": 1, "a": {"b": 2}}));
    assert_eq!(record.len(), 1);
    assert_eq!(record["a-b"], json!(2));
}

#[test]
fn least_nested_match_wins() {
    let record = denest(&json!({"x": {"y": {"z": 1}}, "x-y": 2, "w": 3}));
    assert_eq!(keys(&record), vec!["x-y-z", "x-y", "w"]);
    assert_eq!(find_least_nested(&record, "y"), "2");
}

#[test]
fn least_nested_ties_go_to_first_key() {
    let record = denest(&json!({
        "a": {"uri": "first.jpg"},
        "b": {"uri": "second.jpg"},
        "c": {"d": {"uri": "deep.jpg"}}
    }));
    assert_eq!(find_least_nested(&record, "uri"), "first.jpg");
}

#[test]
fn least_nested_without_match_is_empty() {
    let record = denest(&json!({"a": 1}));
    assert_eq!(find_least_nested(&record, "missing"), "");
    assert_eq!(find_least_nested(&DenestedRecord::new(), "a"), "");
}

#[test]
fn least_nested_renders_non_strings_as_json() {
    let record = denest(&json!({"flag": true, "nothing": null}));
    assert_eq!(find_least_nested(&record, "flag"), "true");
    assert_eq!(find_least_nested(&record, "nothing"), "null");
}
