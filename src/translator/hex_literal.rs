use crate::{MigrateError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::ops::Range;

static HEX_LITERAL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^X'([0-9a-fA-F]*)'$").unwrap()
});

static DEFERRED_CALL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"convert_from\('\\x([0-9a-fA-F]*)', 'utf-8'\)").unwrap()
});

/// How `X'..'` blob literals reach the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum HexDecodeMode {
    /// Leave decoding to the server: `convert_from('\x..', 'utf-8')`.
    /// A bytea column rejects the text result, which the executor repairs
    /// with [`HexLiteralCodec::rewrite_for_bytea`].
    #[default]
    Deferred,
    /// Decode to a quoted text literal while sanitizing. Payloads that are not
    /// valid hex or not UTF-8 abort the run.
    Eager,
}

/// Byte offsets of one blob literal: the whole `X'..'` token and its payload
#[derive(Debug, Clone, PartialEq, Eq)]
struct BlobToken {
    span: Range<usize>,
    payload: Range<usize>,
}

/// Find every `X'<hex>'` token that sits outside string literals and quoted
/// identifiers. sqlite3 always writes blobs with an uppercase `X`.
fn blob_tokens(dump: &str) -> Vec<BlobToken> {
    let bytes = dump.as_bytes();
    let mut tokens = Vec::new();
    let mut in_literal = false;
    let mut in_ident = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' if !in_ident => in_literal = !in_literal,
            b'"' if !in_literal => in_ident = !in_ident,
            b'X' if !in_literal
                && !in_ident
                && bytes.get(i + 1) == Some(&b'\'')
                && !(i > 0 && is_word_byte(bytes[i - 1])) =>
            {
                let start = i + 2;
                let end = start + bytes[start..].iter().take_while(|b| b.is_ascii_hexdigit()).count();
                if bytes.get(end) == Some(&b'\'') {
                    tokens.push(BlobToken { span: i..end + 1, payload: start..end });
                    i = end + 1;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }
    tokens
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub struct HexLiteralCodec;

impl HexLiteralCodec {
    /// Rewrite every blob literal in the dump. Text inside string literals is
    /// never touched, even when it reads like `X'..'`.
    pub fn translate(dump: &str, mode: HexDecodeMode) -> Result<String> {
        match mode {
            HexDecodeMode::Deferred => Self::rewrite_blobs(dump, |_, payload| Ok(Self::deferred_call(payload))),
            HexDecodeMode::Eager => Self::rewrite_blobs(dump, Self::decode_payload),
        }
    }

    /// Decode one `X'..'` literal into a Postgres string literal
    pub fn decode_literal(literal: &str) -> Result<String> {
        let caps = HEX_LITERAL_REGEX.captures(literal).ok_or_else(|| MigrateError::HexDecode {
            literal: literal.to_string(),
            reason: "not a hex blob literal".to_string(),
        })?;
        Self::decode_payload(literal, &caps[1])
    }

    fn decode_payload(literal: &str, payload: &str) -> Result<String> {
        let bytes = hex::decode(payload).map_err(|e| MigrateError::HexDecode {
            literal: literal.to_string(),
            reason: e.to_string(),
        })?;
        let text = String::from_utf8(bytes).map_err(|e| MigrateError::HexDecode {
            literal: literal.to_string(),
            reason: e.to_string(),
        })?;
        Ok(format!("'{}'", text.replace('\'', "''")))
    }

    fn rewrite_blobs<F>(dump: &str, mut render: F) -> Result<String>
    where
        F: FnMut(&str, &str) -> Result<String>,
    {
        let mut result = String::with_capacity(dump.len());
        let mut last = 0;
        for token in blob_tokens(dump) {
            result.push_str(&dump[last..token.span.start]);
            result.push_str(&render(&dump[token.span.clone()], &dump[token.payload])?);
            last = token.span.end;
        }
        result.push_str(&dump[last..]);
        Ok(result)
    }

    /// Server-side decode of a hex payload into text
    pub fn deferred_call(hex_payload: &str) -> String {
        format!("convert_from('\\x{hex_payload}', 'utf-8')")
    }

    /// Swap the first deferred text decode in a statement for a raw bytea
    /// decode. Returns `None` when the statement has no deferred call.
    pub fn rewrite_for_bytea(statement: &str) -> Option<String> {
        if !DEFERRED_CALL_REGEX.is_match(statement) {
            return None;
        }
        let rewritten: Cow<'_, str> = DEFERRED_CALL_REGEX.replacen(statement, 1, "decode('$1', 'hex')");
        Some(rewritten.into_owned())
    }
}
