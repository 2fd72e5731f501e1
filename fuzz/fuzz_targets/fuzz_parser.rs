#![no_main]
use std::cell::RefCell;

use arbitrary::{Arbitrary, Unstructured};
use jsonforge::{
    CommaPolicy, FailureMode, NumberEncoding, ParseError, ParseOptions, StringEncoding, Tokenizer,
    Value, escape_string, parse, parse_tokens, to_string,
};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

const HEADER: usize = 5; // 1 flag byte + 4-byte split seed
const MAX_DEPTH: usize = 6;

thread_local! {
    static RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_os_rng());
}

fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

/// Bytes the tokenizer emits as whitespace or comment tokens.
static TRIVIA: &[&[u8]] = &[
    b" ",
    b"\t",
    b"\n",
    b"\r\n",
    b"/**/",
    b"/* ** */",
    b"/* \xe2\x80\xa8 */",
];

/// Scalars on the edge of what one option set or another accepts.
static EDGE_SCALARS: &[&[u8]] = &[
    b"-0",
    b"007",
    b"-01",
    b"1e400",
    b"9223372036854775808",
    b"18446744073709551616",
    b"-9223372036854775809",
    b"1.",
    b"1e",
    b"tru",
    b"nul",
    br#""🌸""#,
    br#""\ud800""#,
    br#""\udc00\ud800""#,
    b"\"\xed\xa0\xbd\xed\xb8\x80\"",
    b"\"\x07\"",
    br#""\q""#,
    b"\"\xff\"",
    b"/* open",
    b"@",
];

/// Keys drawn from a small pool so objects repeat them.
static KEYS: &[&str] = &["a", "b", "A", "\u{e9}", "", "with space"];

#[derive(Arbitrary, Debug)]
enum Scalar {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Text { text: String, ensure_ascii: bool },
    Edge(u8),
}

/// Writes loosely JSON-shaped text from fuzzer entropy.
struct Generator<'a, 'u> {
    u: &'a mut Unstructured<'u>,
    out: Vec<u8>,
    limit: usize,
}

impl Generator<'_, '_> {
    fn trivia(&mut self) -> arbitrary::Result<()> {
        for _ in 0..self.u.int_in_range(0..=2)? {
            let piece = *self.u.choose(TRIVIA)?;
            self.out.extend_from_slice(piece);
        }
        Ok(())
    }

    fn scalar(&mut self) -> arbitrary::Result<()> {
        match self.u.arbitrary::<Scalar>()? {
            Scalar::Null => self.out.extend_from_slice(b"null"),
            Scalar::Boolean(b) => self.out.extend_from_slice(if b { b"true" } else { b"false" }),
            Scalar::Integer(n) => self.out.extend_from_slice(n.to_string().as_bytes()),
            Scalar::Decimal(d) if d.is_finite() => {
                self.out.extend_from_slice(format!("{d:?}").as_bytes());
            }
            Scalar::Decimal(_) => self.out.extend_from_slice(b"1e999"),
            Scalar::Text { text, ensure_ascii } => {
                self.out.push(b'"');
                self.out
                    .extend_from_slice(escape_string(&text, ensure_ascii).as_bytes());
                self.out.push(b'"');
            }
            Scalar::Edge(i) => {
                let edge = EDGE_SCALARS[usize::from(i) % EDGE_SCALARS.len()];
                self.out.extend_from_slice(edge);
            }
        }
        Ok(())
    }

    fn separator(&mut self, index: usize) -> arbitrary::Result<()> {
        // Now and then drop the comma to exercise recovery.
        if index > 0 && !self.u.ratio(1, 16)? {
            self.out.push(b',');
        }
        Ok(())
    }

    fn value(&mut self, depth: usize) -> arbitrary::Result<()> {
        self.trivia()?;
        let nested = depth > 0 && self.out.len() < self.limit;
        match self.u.int_in_range(0..=if nested { 3 } else { 1 })? {
            0 | 1 => self.scalar()?,
            2 => {
                self.out.push(b'[');
                let len = self.u.int_in_range(0..=4)?;
                for i in 0..len {
                    self.separator(i)?;
                    self.value(depth - 1)?;
                }
                self.close(len, b']')?;
            }
            _ => {
                self.out.push(b'{');
                let len = self.u.int_in_range(0..=4)?;
                for i in 0..len {
                    self.separator(i)?;
                    self.trivia()?;
                    let key = if self.u.ratio(3, 4)? {
                        (*self.u.choose(KEYS)?).to_owned()
                    } else {
                        self.u.arbitrary()?
                    };
                    self.out.push(b'"');
                    self.out.extend_from_slice(escape_string(&key, false).as_bytes());
                    self.out.push(b'"');
                    self.trivia()?;
                    self.out.push(b':');
                    self.value(depth - 1)?;
                }
                self.close(len, b'}')?;
            }
        }
        self.trivia()
    }

    fn close(&mut self, len: usize, end: u8) -> arbitrary::Result<()> {
        if len > 0 && self.u.ratio(1, 4)? {
            self.out.push(b',');
        }
        self.trivia()?;
        // Occasionally leave the structure open.
        if !self.u.ratio(1, 32)? {
            self.out.push(end);
        }
        Ok(())
    }
}

fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if max_size <= HEADER || (size >= HEADER && !seed.is_multiple_of(10)) {
        return fuzzer_mutate(data, size, max_size);
    }
    let entropy: Vec<u8> = with_rng(|rng| {
        data[0] = rng.next_u32() as u8;
        data[1..HEADER].copy_from_slice(&rng.next_u32().to_le_bytes());
        let len = rng.random_range(16..=512);
        (0..len).map(|_| rng.random::<u8>()).collect()
    });

    let limit = max_size - HEADER;
    let mut generator = Generator {
        u: &mut Unstructured::new(&entropy),
        out: Vec::new(),
        limit,
    };
    // Running out of entropy just ends the document early.
    generator.value(MAX_DEPTH).ok();

    let len = generator.out.len().min(limit);
    data[HEADER..HEADER + len].copy_from_slice(&generator.out[..len]);
    HEADER + len
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

fn options(flags: u8) -> ParseOptions {
    ParseOptions {
        failure_mode: match flags & 3 {
            0 => FailureMode::FailImmediately,
            1 => FailureMode::CollectAll,
            _ => FailureMode::Ignore,
        },
        string_encoding: match (flags >> 2) & 3 {
            0 => StringEncoding::Utf8,
            1 => StringEncoding::Utf8Strict,
            _ => StringEncoding::Cesu8,
        },
        number_encoding: if flags & 16 != 0 {
            NumberEncoding::Strict
        } else {
            NumberEncoding::Lenient
        },
        comma_policy: if flags & 32 != 0 {
            CommaPolicy::Strict
        } else {
            CommaPolicy::AllowTrailing
        },
        comments: flags & 64 == 0,
        max_structure_depth: if flags & 128 != 0 { 4 } else { 0 },
        ..ParseOptions::default()
    }
}

fn run(data: &[u8], chunk_size: usize, options: &ParseOptions) -> Result<Value, ParseError> {
    let mut tokens = Tokenizer::with_chunk_size(data, chunk_size);
    parse_tokens(&mut tokens, options)
}

fn parser(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }

    let flags = data[0];
    let split_seed = u32::from_le_bytes(data[1..HEADER].try_into().unwrap()) as usize;
    let data = &data[HEADER..];

    let options = options(flags);
    let whole = run(data, data.len().max(1), &options);
    let streamed = run(data, 1 + split_seed % 64, &options);

    match (&whole, &streamed) {
        (Ok(a), Ok(b)) => {
            assert_eq!(a, b, "chunking changed the parsed value");
            // Non-finite decimals are written as null, so compare text.
            let text = to_string(a);
            let reparsed = parse(&text).expect("encoder output failed to parse");
            assert_eq!(to_string(&reparsed), text);
        }
        (Err(a), Err(b)) => {
            assert_eq!(a.problems, b.problems, "chunking changed the problems");
            assert_eq!(a.partial_result, b.partial_result);
        }
        _ => panic!("chunking changed the outcome: {whole:?} vs {streamed:?}"),
    }
}

fuzz_target!(|data: &[u8]| parser(data));
