
use quickcheck::QuickCheck;

use crate::{
    CompactEncoder, Encoder, ParseOptions, Path, Value, parse, parse_with, to_string,
    to_string_pretty,
};

fn tests() -> u64 {
    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;
    tests
}

/// Property: encoding a value and parsing the text back yields an equal
/// value of the same kind.
#[test]
fn compact_roundtrip_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value) -> bool {
        let text = to_string(&value);
        match parse(&text) {
            Ok(parsed) => parsed == value && parsed.kind() == value.kind(),
            Err(_) => false,
        }
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Value) -> bool);
}

/// Property: pretty output parses to the same value, and re-encoding that
/// value compactly gives the same text as encoding the original.
#[test]
fn pretty_compact_idempotence_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value) -> bool {
        let pretty = to_string_pretty(&value);
        let Ok(reparsed) = parse(&pretty) else {
            return false;
        };
        to_string(&reparsed) == to_string(&value)
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Value) -> bool);
}

/// Property: ASCII-only output contains no byte above 0x7f and decodes back
/// to the original strings, surrogate pairs included.
#[test]
fn ensure_ascii_roundtrip_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value) -> bool {
        let mut encoder = CompactEncoder::new(Vec::new()).ensure_ascii(true);
        if encoder.encode(&value).is_err() {
            return false;
        }
        let bytes = encoder.into_inner();
        bytes.is_ascii() && parse_with(&bytes, &ParseOptions::default()).is_ok_and(|v| v == value)
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Value) -> bool);
}

/// Property: anything serde_json writes for a value parses back to it.
#[test]
fn serde_json_oracle_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value) -> bool {
        let Ok(text) = serde_json::to_string(&value) else {
            return false;
        };
        parse(&text).is_ok_and(|parsed| parsed == value)
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Value) -> bool);
}

/// Property: a path's display form parses back to the same path.
#[test]
fn path_display_roundtrip_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(path: Path) -> bool {
        let text = path.to_string();
        Path::create(&text).is_ok_and(|parsed| parsed == path)
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Path) -> bool);
}

/// Property: every path reported by a traversal resolves to the value that
/// was reported with it.
#[test]
fn traversal_paths_resolve_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value) -> bool {
        let mut ok = true;
        crate::traverse(
            &value,
            |path, found| {
                ok &= value.at_path(path).is_ok_and(|v| v == found);
            },
            false,
        );
        ok
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Value) -> bool);
}

#[test]
fn escaped_keys_survive_a_roundtrip() {
    let mut value = Value::object();
    value
        .insert(String::from("line\nbreak \u{1F600} \"q\""), Value::from(1))
        .unwrap();
    let text = to_string(&value);
    assert_eq!(parse(&text).unwrap(), value);
}
