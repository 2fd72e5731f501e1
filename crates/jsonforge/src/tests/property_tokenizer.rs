
use quickcheck::QuickCheck;

use crate::{TokenKind, Tokenizer};

fn tokens(input: &[u8], chunk_size: usize) -> Vec<(TokenKind, Vec<u8>, usize, bool)> {
    let mut tokenizer = Tokenizer::with_chunk_size(input, chunk_size);
    let mut out = Vec::new();
    while tokenizer.next().unwrap() {
        let t = tokenizer.current().unwrap();
        out.push((t.kind, t.text.to_vec(), t.offset, t.is_error));
    }
    out
}

/// Property: for arbitrary bytes, tokens are non-empty, contiguous and
/// together reproduce the input exactly.
#[test]
fn tokens_tile_the_input_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(input: Vec<u8>, chunk_size: usize) -> bool {
        let lexed = tokens(&input, 1 + chunk_size % 64);
        let mut expected_offset = 0;
        let mut joined = Vec::new();
        for (_, text, offset, _) in &lexed {
            if text.is_empty() || *offset != expected_offset {
                return false;
            }
            expected_offset += text.len();
            joined.extend_from_slice(text);
        }
        joined == input
    }

    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;

    QuickCheck::new()
        .tests(tests)
        .quickcheck(prop as fn(Vec<u8>, usize) -> bool);
}
