#![allow(missing_docs, dead_code)]

use std::io::{self, Read};

pub const DOCUMENT: &str = r#"
{
    "campaign": {
        "id": 9007199254740993,
        "name": "Spring été 🌸",
        "active": true,
        "budget": 1250.75,
        "ratio": -2.5e-3,
        "targets": ["desktop", "mobile"],
        "limits": {"daily": 300, "hourly": null}
    },
    "creatives": [
        {"size": [300, 250], "weight": 0.5},
        {"size": [728, 90], "weight": 0.25, "tags": []}
    ],
    "notes": "line one\nline \"two\"\t/ done",
    "empty": {}
}"#;

// The same document cut at awkward places: inside numbers, literals, escape
// sequences, between surrogate halves and inside a comment.
#[rustfmt::skip]
pub const CHUNKS: [&str; 11] = [
    r#"{"campaign":{"id":90071992547"#,
    r#"40993,"name":"Spring \u00"#,
    r#"e9té \ud83c"#,
    r#"\udf38","active":tr"#,
    r#"ue,"budget":1250."#,
    r#"75,"ratio":-2.5e"#,
    r#"-3,"targets":["desktop","mobile"],"limits":{"daily":300,"hourly":nu"#,
    r#"ll}},/* creat"#,
    r#"ives */ "creatives":[{"size":[300,250],"weight":0.5},"#,
    r#"{"size":[728,90],"weight":0.25,"tags":[]}],"notes":"line one\nline \"two\"\t/ done","#,
    r#""empty":{}}"#,
];

/// Hands out at most one chunk per `read` call.
pub struct ChunkedReader<'a> {
    chunks: Vec<&'a [u8]>,
    next: usize,
}

impl<'a> ChunkedReader<'a> {
    pub fn new(chunks: impl IntoIterator<Item = &'a [u8]>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
            next: 0,
        }
    }
}

impl<'a> Read for ChunkedReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(&chunk) = self.chunks.get(self.next) else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        let rest: &'a [u8] = &chunk[n..];
        if rest.is_empty() {
            self.next += 1;
        } else {
            self.chunks[self.next] = rest;
        }
        Ok(n)
    }
}
