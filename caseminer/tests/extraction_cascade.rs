//! End-to-end properties of the extraction cascade.

use caseminer::schema::{schema, Arity, ExtractionSchema};
use caseminer::{clean, extract, extract_answer, normalize, NormalizedPayload, Verdict};
use pretty_assertions::assert_eq;
use serde_json::json;

static PERSON: ExtractionSchema = ExtractionSchema {
    name: "person",
    arity: Arity::Single,
    expected_keys: &["name", "role"],
    min_expected_keys_present: 2,
    field_kinds: &[],
};

#[test]
fn cleaning_is_idempotent() {
    let inputs = [
        "<think>draft {\"answer\": \"no\"}</think>{\"answer\": \"yes\"}",
        "no markup at all",
        "",
        "<THINKING>\nmultiline\n</THINKING>rest",
        "<tag>inner</tag> <other/>",
        "dangling < bracket and > bracket",
    ];
    for raw in inputs {
        let once = clean(raw);
        assert_eq!(clean(&once), once, "clean not idempotent on {raw:?}");
    }
}

#[test]
fn extraction_is_deterministic() {
    let charges = schema("charges").unwrap();
    let raw = r#"
Some prose first. [{"statute": "18 U.S.C. § 1960", "severity": "felony"}]
And a second list: [{"statute": "21 U.S.C. § 846"}]
"#;
    let first = extract(raw, charges);
    assert!(first.is_some());
    for _ in 0..10 {
        assert_eq!(extract(raw, charges), first);
    }
}

#[test]
fn verdict_set_is_closed_for_arbitrary_input() {
    let inputs = [
        "",
        "garbage",
        "{\"answer\": \"maybe\"}",
        "{\"answer\": 42}",
        "{{{{",
        "\u{0000}\u{0001}",
        "ĄĆĘ unicode ŻŹ",
        "[\"yes\"]",
    ];
    for raw in inputs {
        let verdict = extract_answer(raw);
        assert!(
            matches!(verdict, Verdict::Yes | Verdict::No | Verdict::Unknown),
            "open verdict for {raw:?}"
        );
    }
}

#[test]
fn normalization_arity_matches_schema() {
    let meta = schema("case_metadata").unwrap();
    let charges = schema("charges").unwrap();

    let single_inputs = [
        json!({"district_office": "SDNY"}),
        json!([{"district_office": "SDNY"}]),
    ];
    for value in single_inputs {
        match normalize(value, meta) {
            Some(NormalizedPayload::Single(_)) | None => {}
            other => panic!("wrong arity for single schema: {other:?}"),
        }
    }

    let list_inputs = [
        json!([{"statute": "x"}]),
        json!({"statute": "x"}),
        json!([]),
    ];
    for value in list_inputs {
        match normalize(value, charges) {
            Some(NormalizedPayload::List(_)) | None => {}
            other => panic!("wrong arity for list schema: {other:?}"),
        }
    }
}

#[test]
fn last_match_wins_across_multiple_objects() {
    let raw = r#"{"answer":"no"} ... final: {"answer":"yes"}"#;
    assert_eq!(extract_answer(raw), Verdict::Yes);
}

#[test]
fn last_match_wins_for_schema_extraction() {
    let value = extract(
        r#"
First attempt: {"name": "Draft Person", "role": "placeholder"}
Corrected: {"name": "Jane Doe", "role": "defendant"}
"#,
        &PERSON,
    )
    .unwrap();
    assert_eq!(value, json!({"name": "Jane Doe", "role": "defendant"}));
}

#[test]
fn fenced_block_beats_prose_braces() {
    let raw = r#"
The text mentions {brace noise} and also {"name": "Prose Person", "role": "extra"}.
```json
{"name": "Fenced Person", "role": "defendant"}
```
"#;
    let value = extract(raw, &PERSON).unwrap();
    assert_eq!(value["name"], "Fenced Person");
}

#[test]
fn truncated_object_is_recovered() {
    let raw = r#"{"name": "Jane", "role": "defendant""#;
    let value = extract(raw, &PERSON).unwrap();
    assert_eq!(value, json!({"name": "Jane", "role": "defendant"}));
}

#[test]
fn truncated_object_with_trailing_prose_is_recovered() {
    let raw = "{\"name\": \"Jane\", \"role\": \"defendant\"\n\nNote: the response was cut off";
    let value = extract(raw, &PERSON).unwrap();
    assert_eq!(value, json!({"name": "Jane", "role": "defendant"}));
}

#[test]
fn think_tag_content_never_surfaces() {
    let raw = "<think>reasoning...</think>\n{\"answer\":\"unknown\"}";
    assert_eq!(extract_answer(raw), Verdict::Unknown);

    // A plausible-looking object inside a think block must not leak out.
    let raw = "<think>{\"name\": \"Leaked\", \"role\": \"ghost\"}</think>";
    assert_eq!(extract(raw, &PERSON), None);
}

#[test]
fn implausible_json_is_rejected_and_cascade_continues() {
    // The fenced block parses but shares no keys with the schema; the scan
    // then finds the plausible object in prose.
    let raw = r#"
```json
{"unrelated": true, "fields": 3}
```
The actual record is {"name": "Jane", "role": "defendant"} above.
"#;
    let value = extract(raw, &PERSON).unwrap();
    assert_eq!(value["name"], "Jane");
}

#[test]
fn implausible_json_everywhere_returns_none() {
    let raw = r#"```json
{"unrelated": true}
```"#;
    assert_eq!(extract(raw, &PERSON), None);
}

#[test]
fn wrap_unwrap_round_trip() {
    let charges = schema("charges").unwrap();
    let meta = schema("case_metadata").unwrap();

    let wrapped = normalize(json!({"statute": "a"}), charges).unwrap();
    assert_eq!(wrapped, NormalizedPayload::List(vec![json!({"statute": "a"})]));

    let unwrapped = normalize(json!([{"district_office": "SDNY"}]), meta).unwrap();
    match unwrapped {
        NormalizedPayload::Single(map) => assert_eq!(map["district_office"], "SDNY"),
        other => panic!("expected Single, got {other:?}"),
    }
}

#[test]
fn messy_real_world_response_end_to_end() {
    let participants = schema("participants").unwrap();
    let raw = r#"<think>
The press release names two individuals. Let me structure them.
{"name": "early draft"}
</think>
Sure! Based on the press release, here are the participants:

```json
[
  {"name": "Jane Doe", "role": "defendant", "age": 44, "status": "pleaded guilty"},
  {"name": "John Roe", "role": "co-conspirator", "age": null, "status": "indicted"},
]
```

Let me know if you need anything else."#;

    let value = extract(raw, participants).unwrap();
    let payload = normalize(value, participants).unwrap();
    match payload {
        NormalizedPayload::List(items) => {
            assert_eq!(items.len(), 2);
            assert_eq!(items[0]["name"], "Jane Doe");
            assert_eq!(items[1]["role"], "co-conspirator");
        }
        other => panic!("expected List, got {other:?}"),
    }
}

#[test]
fn single_quoted_sloppy_json_is_repaired() {
    let raw = "Result: {'name': 'Jane', 'role': 'defendant'}";
    let value = extract(raw, &PERSON).unwrap();
    assert_eq!(value["role"], "defendant");
}
