//! Flat, column-projected views of report rows for tabular output.

use crate::aggregate::UrlHits;
use crate::record::LogRecord;
use crate::reports::{BotRow, CrawlRow, IpRow, StatusRow, UrlDetailRow, UrlRow};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use itertools::Itertools;

pub const URL_FIELDS: &[&str] = &["url", "hits", "bot_hits", "human_hits", "status_codes", "avg_bytes", "avg_interval", "last_access"];
pub const URL_DETAIL_FIELDS: &[&str] = &["url", "hits", "bot_hits", "human_hits", "bot_count", "status_codes", "avg_bytes", "last_access"];
pub const BOT_FIELDS: &[&str] = &[
    "bot_name",
    "bot_category",
    "hits",
    "unique_urls",
    "status_codes",
    "avg_bytes",
    "first_seen",
    "last_seen",
    "verified",
    "verified_count",
    "unverified_count",
];
pub const STATUS_FIELDS: &[&str] = &["code", "count", "percentage", "top_urls"];
pub const IP_FIELDS: &[&str] = &["ip", "hits", "is_bot", "bot_name", "unique_urls"];
pub const CRAWL_FIELDS: &[&str] = &["url", "crawl_count", "avg_interval", "last_crawl"];
pub const RAW_FIELDS: &[&str] = &[
    "server",
    "domain",
    "ips",
    "datetime",
    "method",
    "url",
    "protocol",
    "status_code",
    "bytes_sent",
    "referer",
    "user_agent",
    "extra_id",
    "is_bot",
    "bot_name",
    "bot_category",
    "verified_googlebot",
];

/// A row that can render any of its fields as text by name.
pub trait FlatRow {
    /// `None` when the row has no such field.
    fn field(&self, name: &str) -> Option<String>;
}

/// One output line per row, following `fields`; unknown names render empty.
pub fn project<R: FlatRow, S: AsRef<str>>(rows: &[R], fields: &[S]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| fields.iter().map(|f| row.field(f.as_ref()).unwrap_or_default()).collect())
        .collect()
}

fn ts(t: &Option<DateTime<FixedOffset>>) -> String {
    t.map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, false)).unwrap_or_default()
}

fn url_hits(items: &[UrlHits]) -> String {
    items.iter().map(|u| format!("{} ({})", u.url, u.hits)).join(", ")
}

impl FlatRow for UrlRow {
    fn field(&self, name: &str) -> Option<String> {
        Some(match name {
            "url" => self.url.clone(),
            "hits" => self.hits.to_string(),
            "bot_hits" => self.bot_hits.to_string(),
            "human_hits" => self.human_hits.to_string(),
            "status_codes" => self.status_codes.clone(),
            "avg_bytes" => self.avg_bytes.to_string(),
            "avg_interval" => self.avg_interval.clone().unwrap_or_default(),
            "last_access" => ts(&self.last_access),
            _ => return None,
        })
    }
}

impl FlatRow for UrlDetailRow {
    fn field(&self, name: &str) -> Option<String> {
        Some(match name {
            "url" => self.url.clone(),
            "hits" => self.hits.to_string(),
            "bot_hits" => self.bot_hits.to_string(),
            "human_hits" => self.human_hits.to_string(),
            "status_codes" => self.status_codes.clone(),
            "avg_bytes" => self.avg_bytes.to_string(),
            "last_access" => ts(&self.last_access),
            "bot_count" => self.bot_count.to_string(),
            "bots" => self.bots.iter().map(|b| format!("{} ({})", b.bot_name, b.hits)).join(", "),
            _ => return None,
        })
    }
}

impl FlatRow for BotRow {
    fn field(&self, name: &str) -> Option<String> {
        Some(match name {
            "bot_name" => self.bot_name.clone(),
            "bot_category" => self.bot_category.map(|c| c.to_string()).unwrap_or_default(),
            "hits" => self.hits.to_string(),
            "unique_urls" => self.unique_urls.to_string(),
            "status_codes" => self.status_codes.clone(),
            "avg_bytes" => self.avg_bytes.to_string(),
            "first_seen" => ts(&self.first_seen),
            "last_seen" => ts(&self.last_seen),
            "verified" | "verified_googlebot" => self.verified.to_string(),
            "verified_count" => self.verified_count.to_string(),
            "unverified_count" => self.unverified_count.to_string(),
            _ => return None,
        })
    }
}

impl FlatRow for StatusRow {
    fn field(&self, name: &str) -> Option<String> {
        Some(match name {
            "code" => self.code.to_string(),
            "count" => self.count.to_string(),
            "percentage" => self.percentage.to_string(),
            "top_urls" => url_hits(&self.top_urls),
            _ => return None,
        })
    }
}

impl FlatRow for IpRow {
    fn field(&self, name: &str) -> Option<String> {
        Some(match name {
            "ip" => self.ip.clone(),
            "hits" => self.hits.to_string(),
            "is_bot" => self.is_bot.to_string(),
            "bot_name" => self.bot_name.clone(),
            "unique_urls" => self.unique_urls.to_string(),
            _ => return None,
        })
    }
}

impl FlatRow for CrawlRow {
    fn field(&self, name: &str) -> Option<String> {
        Some(match name {
            "url" => self.url.clone(),
            "crawl_count" => self.crawl_count.to_string(),
            "avg_interval" => self.avg_interval.clone().unwrap_or_default(),
            "last_crawl" => ts(&self.last_crawl),
            _ => return None,
        })
    }
}

impl FlatRow for LogRecord {
    fn field(&self, name: &str) -> Option<String> {
        Some(match name {
            "server" => self.server.clone(),
            "domain" => self.domain.clone(),
            "ips" => self.client_identifiers.join(", "),
            "datetime" => ts(&self.timestamp),
            "method" => self.method.clone(),
            "url" => self.url.clone(),
            "protocol" => self.protocol.clone(),
            "status_code" => self.status_code.to_string(),
            "bytes_sent" => self.bytes_sent.to_string(),
            "referer" => self.referer.clone(),
            "user_agent" => self.user_agent.clone(),
            "extra_id" => self.extra_id.clone(),
            "is_bot" => self.is_bot.to_string(),
            "bot_name" => self.bot_name.clone(),
            "bot_category" => self.category_str().to_string(),
            "verified_bot" | "verified_googlebot" => self.verified_bot.to_string(),
            _ => return None,
        })
    }
}

/// Space-padded columns with a header line.
pub fn render_table<S: AsRef<str>>(fields: &[S], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = fields.iter().map(|f| f.as_ref().chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let mut out = pad_line(fields.iter().map(|f| f.as_ref()), &widths);
    out.push('\n');
    for row in rows {
        out.push_str(&pad_line(row.iter().map(|s| s.as_str()), &widths));
        out.push('\n');
    }
    out
}

fn pad_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(c, w)| format!("{c:<w$}", w = *w))
        .join("  ")
        .trim_end()
        .to_string()
}
