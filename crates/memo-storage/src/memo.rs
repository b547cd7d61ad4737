//! Memo record codec.
//!
//! A stored record travels inside an SPL memo. Two text encodings exist:
//!
//! * legacy: `METADATA:<address>:<payload>`
//! * framed: `METADATA:v2:<address>:<byte_len>:<payload>`
//!
//! The framed form carries the payload length so the payload is cut out by
//! position and never split on. The legacy form is still decoded so records
//! written by older clients stay readable.
//!
//! The memo program echoes the memo into the transaction logs as
//! `Program log: Memo (len N): "<escaped>"`, so decoding first undoes that
//! quoting.

use serde::Serialize;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::str::FromStr;

use crate::error::StorageError;

pub const MEMO_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");

pub const RECORD_MARKER: &str = "METADATA:";
const FRAMED_TAG: &str = "v2:";
const MEMO_LOG_PREFIX: &str = "Memo (len ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoFormat {
    Legacy,
    #[default]
    Framed,
}

impl FromStr for MemoFormat {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" => Ok(MemoFormat::Legacy),
            "framed" => Ok(MemoFormat::Framed),
            _ => Err(StorageError::InvalidInput(format!(
                "Unknown memo format: {}. Please use 'framed' or 'legacy'.",
                s
            ))),
        }
    }
}

impl fmt::Display for MemoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoFormat::Legacy => write!(f, "legacy"),
            MemoFormat::Framed => write!(f, "framed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoRecord {
    pub address: String,
    pub content: String,
    pub format: MemoFormat,
}

pub fn encode_record(format: MemoFormat, address: &Pubkey, content: &str) -> String {
    match format {
        MemoFormat::Legacy => format!("{}{}:{}", RECORD_MARKER, address, content),
        MemoFormat::Framed => format!(
            "{}{}{}:{}:{}",
            RECORD_MARKER,
            FRAMED_TAG,
            address,
            content.len(),
            content
        ),
    }
}

/// Memo instruction carrying `memo`. Every key in `signers` must sign the
/// transaction; listing the storage account here is what puts the memo
/// transaction into that account's signature history.
pub fn memo_instruction(memo: &str, signers: &[&Pubkey]) -> Instruction {
    Instruction {
        program_id: MEMO_PROGRAM_ID,
        accounts: signers
            .iter()
            .map(|pubkey| AccountMeta::new_readonly(**pubkey, true))
            .collect(),
        data: memo.as_bytes().to_vec(),
    }
}

/// Decode a record from a single log line, if the line carries one.
pub fn decode_log_line(line: &str) -> Option<MemoRecord> {
    if !line.contains(RECORD_MARKER) {
        return None;
    }
    let memo = memo_text(line)?;
    decode_memo(&memo)
}

/// Decode a record from raw memo text.
pub fn decode_memo(memo: &str) -> Option<MemoRecord> {
    let (_, rest) = memo.split_once(RECORD_MARKER)?;

    if let Some(framed) = rest.strip_prefix(FRAMED_TAG) {
        let (address, rest) = framed.split_once(':')?;
        let (len, body) = rest.split_once(':')?;
        let len: usize = len.parse().ok()?;
        let content = body.get(..len)?;
        return Some(MemoRecord {
            address: address.to_string(),
            content: content.to_string(),
            format: MemoFormat::Framed,
        });
    }

    // Everything after the address field is content, colons included.
    let (address, content) = rest.split_once(':')?;
    Some(MemoRecord {
        address: address.to_string(),
        content: content.to_string(),
        format: MemoFormat::Legacy,
    })
}

/// First record in `logs` that belongs to `address`.
pub fn find_record<S: AsRef<str>>(logs: &[S], address: &Pubkey) -> Option<MemoRecord> {
    let expected = address.to_string();
    logs.iter()
        .filter_map(|line| decode_log_line(line.as_ref()))
        .find(|record| record.address == expected)
}

/// Extract the memo text from a log line. Quoted memo-program output is
/// unescaped; anything else is returned as-is.
fn memo_text(line: &str) -> Option<String> {
    if let Some(start) = line.find(MEMO_LOG_PREFIX) {
        let after = &line[start + MEMO_LOG_PREFIX.len()..];
        if let Some((_, quoted)) = after.split_once("): \"") {
            let inner = quoted.strip_suffix('"')?;
            return unescape_debug(inner);
        }
    }
    Some(line.to_string())
}

/// Reverse of `str`'s `Debug` escaping.
fn unescape_debug(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            'u' => {
                if chars.next()? != '{' {
                    return None;
                }
                let mut hex = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        h => hex.push(h),
                    }
                }
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            _ => return None,
        }
    }
    Some(out)
}
