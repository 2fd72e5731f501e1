#![allow(missing_docs)]

mod common;

use jsonforge::{
    CompactEncoder, Encoder, FailureMode, ParseOptions, PrettyEncoder, Value, parse, parse_with,
    to_string, to_string_pretty,
};

use crate::common::DOCUMENT;

fn encode_with<E: Encoder<Error = std::io::Error>>(mut encoder: E, value: &Value) -> E {
    encoder.encode(value).unwrap();
    encoder
}

#[test]
fn pretty_document() {
    let value = parse(DOCUMENT).unwrap();
    insta::assert_snapshot!(to_string_pretty(&value), @r#"
    {
      "campaign": {
        "active": true,
        "budget": 1250.75,
        "id": 9007199254740993,
        "limits": {
          "daily": 300,
          "hourly": null
        },
        "name": "Spring été 🌸",
        "ratio": -0.0025,
        "targets": [
          "desktop",
          "mobile"
        ]
      },
      "creatives": [
        {
          "size": [
            300,
            250
          ],
          "weight": 0.5
        },
        {
          "size": [
            728,
            90
          ],
          "tags": [],
          "weight": 0.25
        }
      ],
      "empty": {},
      "notes": "line one\nline \"two\"\t/ done"
    }
    "#);
}

#[test]
fn pretty_with_wide_indent_and_ascii() {
    let value = parse(DOCUMENT).unwrap();
    let creatives = value.at_path_str(".creatives").unwrap();
    let encoder = encode_with(PrettyEncoder::with_indent(Vec::new(), 4).ensure_ascii(true), creatives);
    insta::assert_snapshot!(String::from_utf8(encoder.into_inner()).unwrap(), @r#"
    [
        {
            "size": [
                300,
                250
            ],
            "weight": 0.5
        },
        {
            "size": [
                728,
                90
            ],
            "tags": [],
            "weight": 0.25
        }
    ]
    "#);
}

#[test]
fn compact_ascii() {
    let value = parse(DOCUMENT).unwrap();
    let campaign = value.at_path_str(".campaign").unwrap();
    let encoder = encode_with(CompactEncoder::new(Vec::new()).ensure_ascii(true), campaign);
    insta::assert_snapshot!(String::from_utf8(encoder.into_inner()).unwrap(), @r#"{"active":true,"budget":1250.75,"id":9007199254740993,"limits":{"daily":300,"hourly":null},"name":"Spring \u00e9t\u00e9 \ud83c\udf38","ratio":-0.0025,"targets":["desktop","mobile"]}"#);
}

#[test]
fn special_values() {
    let value = Value::from(vec![
        Value::from(f64::NAN),
        Value::from(f64::INFINITY),
        Value::from(1e21),
        Value::from(-0.0),
        Value::from(i64::MIN),
        Value::from("\u{7}\u{2028}/\\"),
        Value::array(),
        Value::object(),
    ]);
    insta::assert_snapshot!(to_string(&value), @r#"[null,null,1e21,-0.0,-9223372036854775808,"\u0007\u2028/\\",[],{}]"#);
}

#[test]
fn problems_are_listed_one_per_line() {
    let options = ParseOptions {
        failure_mode: FailureMode::CollectAll,
        ..Default::default()
    };
    let err = parse_with(b"[@,\n@]", &options).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @r#"
    At line 1:2 (char 1): Encountered invalid token unknown: "@"
    At line 2:1 (char 4): Encountered invalid token unknown: "@"
    "#);
    insta::assert_snapshot!(to_string(&err.partial_result), @"[null,null]");
}
