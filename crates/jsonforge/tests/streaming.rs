#![allow(missing_docs)]

mod common;

use jsonforge::{
    FailureMode, ParseError, ParseOptions, Tokenizer, Value, parse, parse_reader, parse_tokens,
};
use quickcheck::QuickCheck;
use rstest::rstest;

use crate::common::{CHUNKS, ChunkedReader, DOCUMENT};

fn collect_all() -> ParseOptions {
    ParseOptions {
        failure_mode: FailureMode::CollectAll,
        ..Default::default()
    }
}

fn parse_chunked(input: &[u8], chunk_size: usize) -> Result<Value, ParseError> {
    let mut tokens = Tokenizer::with_chunk_size(input, chunk_size);
    parse_tokens(&mut tokens, &collect_all())
}

fn same_outcome(a: &Result<Value, ParseError>, b: &Result<Value, ParseError>) -> bool {
    match (a, b) {
        (Ok(a), Ok(b)) => a == b,
        (Err(a), Err(b)) => a.problems == b.problems && a.partial_result == b.partial_result,
        _ => false,
    }
}

#[test]
fn chunks_match_the_document() {
    let whole = parse(DOCUMENT).unwrap();
    let streamed = parse_reader(
        ChunkedReader::new(CHUNKS.iter().map(|c| c.as_bytes())),
        &ParseOptions::default(),
    )
    .unwrap();
    assert_eq!(streamed, whole);
    assert_eq!(
        streamed.at_path_str(".campaign.name").unwrap(),
        &Value::from("Spring été 🌸")
    );
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(16)]
#[case(4096)]
fn tokenizer_chunk_size_does_not_matter(#[case] chunk_size: usize) {
    let mut tokens = Tokenizer::with_chunk_size(
        ChunkedReader::new(CHUNKS.iter().map(|c| c.as_bytes())),
        chunk_size,
    );
    let streamed = parse_tokens(&mut tokens, &ParseOptions::default()).unwrap();
    assert_eq!(streamed, parse(DOCUMENT).unwrap());
}

/// Property: cutting a document short, splicing a byte into it and reading it
/// in arbitrary chunk sizes produces the same value and the same problems as
/// reading it at once.
#[test]
fn damaged_documents_stream_identically_quickcheck() {
    fn prop(cut: usize, splice: Option<(usize, u8)>, chunk_size: usize) -> bool {
        let mut input = DOCUMENT.as_bytes().to_vec();
        input.truncate(cut % (input.len() + 1));
        if let Some((at, byte)) = splice {
            input.insert(at % (input.len() + 1), byte);
        }
        let whole = parse_chunked(&input, input.len().max(1));
        let streamed = parse_chunked(&input, 1 + chunk_size % 17);
        same_outcome(&whole, &streamed)
    }

    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;

    QuickCheck::new()
        .tests(tests)
        .quickcheck(prop as fn(usize, Option<(usize, u8)>, usize) -> bool);
}

/// Property: arbitrary bytes never panic the parser, and chunking never
/// changes what it reports.
#[test]
fn arbitrary_bytes_stream_identically_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(input: Vec<u8>, chunk_size: usize) -> bool {
        let whole = parse_chunked(&input, input.len().max(1));
        let streamed = parse_chunked(&input, 1 + chunk_size % 7);
        same_outcome(&whole, &streamed)
    }

    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;

    QuickCheck::new()
        .tests(tests)
        .quickcheck(prop as fn(Vec<u8>, usize) -> bool);
}

#[test]
fn consecutive_documents_share_a_tokenizer() {
    let options = ParseOptions {
        complete_parse: false,
        ..Default::default()
    };
    let mut tokens = Tokenizer::with_chunk_size(
        ChunkedReader::new([&b"{\"a\":"[..], &b" 1}\n[tr"[..], &b"ue]  "[..]]),
        2,
    );
    assert_eq!(
        parse_tokens(&mut tokens, &options).unwrap().to_string(),
        r#"{"a":1}"#
    );
    assert_eq!(parse_tokens(&mut tokens, &options).unwrap().to_string(), "[true]");
}
