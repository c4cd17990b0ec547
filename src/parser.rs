use crate::record::LogRecord;
use crate::signatures;
use crate::verify::{self, VerifiedNetworkCache};
use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use std::io::{self, BufRead};
use thiserror::Error;
use tracing::debug;

pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

// [server]:::[domain]:::ip1,ip2 - - [01/Jan/2024:12:00:00 +0000] "GET /p HTTP/1.1" 200 1234 "ref" "agent" "extra"
static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"^\[([^\]]+)\]:::\[([^\]]+)\]:::"#,
        r#"(.+?) - - "#,
        r#"\[([^\]]+)\] "#,
        r#""(\w+) (.+?) (HTTP/[\d.]+)" "#,
        r#"(\d+) (\d+) "#,
        r#""([^"]*)" "([^"]*)" "([^"]*)"$"#,
    ))
    .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("blank line")]
    Blank,
    #[error("line does not match the access log grammar")]
    NoMatch,
    #[error("numeric field out of range: {0}")]
    InvalidNumber(String),
}

/// Parse one line, verifying Google crawlers against the process-wide cache.
pub fn parse_line(line: &str) -> Result<LogRecord, LineError> {
    parse_line_with(line, verify::global())
}

pub fn parse_line_with(line: &str, ranges: &VerifiedNetworkCache) -> Result<LogRecord, LineError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(LineError::Blank);
    }
    let caps = LINE_RE.captures(line).ok_or(LineError::NoMatch)?;
    let field = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");

    let client_identifiers: Vec<String> = field(3)
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if client_identifiers.is_empty() {
        return Err(LineError::NoMatch);
    }

    let status_code = field(8)
        .parse::<u16>()
        .map_err(|_| LineError::InvalidNumber(field(8).to_string()))?;
    let bytes_sent = field(9)
        .parse::<u64>()
        .map_err(|_| LineError::InvalidNumber(field(9).to_string()))?;
    let timestamp = parse_timestamp(field(4));
    let user_agent = field(11).to_string();

    let class = signatures::classify(&user_agent);
    let verified_bot = verify::is_verifiable_bot(class.bot_name) && ranges.is_verified(&client_identifiers[0]);

    Ok(LogRecord {
        server: field(1).to_string(),
        domain: field(2).to_string(),
        client_identifiers,
        timestamp,
        method: field(5).to_string(),
        url: field(6).to_string(),
        protocol: field(7).to_string(),
        status_code,
        bytes_sent,
        referer: field(10).to_string(),
        user_agent,
        extra_id: field(12).to_string(),
        is_bot: class.is_bot,
        bot_name: class.bot_name.to_string(),
        bot_category: class.category,
        verified_bot,
    })
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()
}

/// Records of one source plus the number of non-blank lines that were rejected.
#[derive(Debug, Clone, Default)]
pub struct ParsedSource {
    pub records: Vec<LogRecord>,
    pub errors: usize,
}

impl ParsedSource {
    pub fn extend(&mut self, other: ParsedSource) {
        self.records.extend(other.records);
        self.errors += other.errors;
    }

    fn push_line(&mut self, line_number: usize, line: &str, ranges: &VerifiedNetworkCache) {
        match parse_line_with(line, ranges) {
            Ok(rec) => self.records.push(rec),
            Err(LineError::Blank) => {}
            Err(e) => {
                debug!(line = line_number, error = %e, "rejected log line");
                self.errors += 1;
            }
        }
    }
}

pub fn parse_lines<I, S>(lines: I, ranges: &VerifiedNetworkCache) -> ParsedSource
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = ParsedSource::default();
    for (idx, line) in lines.into_iter().enumerate() {
        out.push_line(idx + 1, line.as_ref(), ranges);
    }
    out
}

/// Read a whole source; invalid UTF-8 is replaced rather than rejected.
pub fn parse_source<R: BufRead>(reader: R) -> io::Result<ParsedSource> {
    parse_source_with(reader, verify::global())
}

pub fn parse_source_with<R: BufRead>(mut reader: R, ranges: &VerifiedNetworkCache) -> io::Result<ParsedSource> {
    let mut parsed = ParsedSource::default();
    let mut buf = Vec::with_capacity(1024);
    let mut line_number = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number += 1;
        parsed.push_line(line_number, &String::from_utf8_lossy(&buf), ranges);
    }
    debug!(records = parsed.records.len(), errors = parsed.errors, "parsed source");
    Ok(parsed)
}

/// Parse several in-memory sources on the rayon pool. Results are concatenated
/// in the order the sources were given.
pub fn parse_sources(sources: &[Vec<u8>], ranges: &VerifiedNetworkCache) -> ParsedSource {
    let parts: Vec<ParsedSource> = sources
        .par_iter()
        .map(|bytes| {
            let text = String::from_utf8_lossy(bytes);
            parse_lines(text.lines(), ranges)
        })
        .collect();
    let mut out = ParsedSource::default();
    for p in parts {
        out.extend(p);
    }
    out
}
