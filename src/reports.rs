//! Report builders over a parsed record set.
//!
//! Every builder is a pure function of `&[LogRecord]`. Rows sorted by hits
//! keep first-encountered order among equal counts.

use crate::aggregate::{self, avg_bytes, OrderedCounter, OrderedGroups, UrlHits};
use crate::record::{BotCategory, LogRecord};
use crate::temporal::{self, SeenRange};
use crate::verify;
use ahash::AHashSet;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

pub const SUMMARY_TOP_N: usize = 10;
pub const STATUS_TOP_URLS: usize = 5;

type Timestamp = DateTime<FixedOffset>;

// ---------------------------------------------------------------------------
// summary

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub code: u16,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BotHits {
    pub bot_name: String,
    pub hits: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayHits {
    pub date: NaiveDate,
    pub hits: u64,
}

/// Hits under one label of a summary breakdown (category, method, domain, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelHits {
    pub label: String,
    pub hits: u64,
}

impl LabelHits {
    fn from_counts(counts: Vec<(String, u64)>) -> Vec<LabelHits> {
        counts.into_iter().map(|(label, hits)| LabelHits { label, hits }).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSummary {
    pub total_requests: u64,
    pub total_bytes: u128,
    pub unique_urls: usize,
    pub unique_ips: usize,
    pub bot_requests: u64,
    pub human_requests: u64,
    pub verified_bot_requests: u64,
    pub bot_percentage: f64,
    pub unique_bots: usize,
    pub status_distribution: Vec<StatusCount>,
    pub top_urls: Vec<UrlHits>,
    pub top_bots: Vec<BotHits>,
    pub hits_per_day: Vec<DayHits>,
    /// Local clock hours, ascending.
    pub hits_per_hour: Vec<LabelHits>,
    /// Named bot hits per category, most frequent first.
    pub hits_by_category: Vec<LabelHits>,
    pub hits_by_method: Vec<LabelHits>,
    pub hits_by_domain: Vec<LabelHits>,
    pub hits_by_server: Vec<LabelHits>,
}

/// Whole-set overview; `None` for an empty record set.
pub fn summary(records: &[LogRecord]) -> Option<TrafficSummary> {
    if records.is_empty() {
        return None;
    }
    let mut urls: OrderedCounter<String> = OrderedCounter::new();
    let mut bots: OrderedCounter<String> = OrderedCounter::new();
    let mut codes: OrderedCounter<u16> = OrderedCounter::new();
    let mut categories: OrderedCounter<String> = OrderedCounter::new();
    let mut methods: OrderedCounter<String> = OrderedCounter::new();
    let mut domains: OrderedCounter<String> = OrderedCounter::new();
    let mut servers: OrderedCounter<String> = OrderedCounter::new();
    let mut ips: AHashSet<&str> = AHashSet::new();
    let mut total_bytes = 0u128;
    let mut bot_requests = 0u64;
    let mut verified_bot_requests = 0u64;

    for r in records {
        urls.add(&r.url);
        codes.add(&r.status_code);
        ips.extend(r.client_identifiers.iter().map(|s| s.as_str()));
        methods.add(&r.method);
        domains.add(&r.domain);
        servers.add(&r.server);
        total_bytes += u128::from(r.bytes_sent);
        if r.is_bot {
            bot_requests += 1;
            if r.verified_bot {
                verified_bot_requests += 1;
            }
            if !r.bot_name.is_empty() {
                bots.add(&r.bot_name);
                categories.add(&r.category_str().to_string());
            }
        }
    }

    let total = records.len() as u64;
    Some(TrafficSummary {
        total_requests: total,
        total_bytes,
        unique_urls: urls.len(),
        unique_ips: ips.len(),
        bot_requests,
        human_requests: total - bot_requests,
        verified_bot_requests,
        bot_percentage: aggregate::percentage(bot_requests, total),
        unique_bots: bots.len(),
        status_distribution: codes
            .most_common()
            .into_iter()
            .map(|(code, count)| StatusCount { code, count })
            .collect(),
        top_urls: UrlHits::from_counts(urls.top(SUMMARY_TOP_N)),
        top_bots: bots
            .top(SUMMARY_TOP_N)
            .into_iter()
            .map(|(bot_name, hits)| BotHits { bot_name, hits })
            .collect(),
        hits_per_day: temporal::hits_per_day(records.iter().filter_map(|r| r.timestamp.as_ref()))
            .into_iter()
            .map(|(date, hits)| DayHits { date, hits })
            .collect(),
        hits_per_hour: LabelHits::from_counts(temporal::hits_per_hour(
            records.iter().filter_map(|r| r.timestamp.as_ref()),
        )),
        hits_by_category: LabelHits::from_counts(categories.most_common()),
        hits_by_method: LabelHits::from_counts(methods.most_common()),
        hits_by_domain: LabelHits::from_counts(domains.most_common()),
        hits_by_server: LabelHits::from_counts(servers.most_common()),
    })
}

// ---------------------------------------------------------------------------
// per url

#[derive(Debug, Default)]
struct UrlAcc {
    hits: u64,
    bot_hits: u64,
    human_hits: u64,
    codes: OrderedCounter<u16>,
    total_bytes: u128,
    times: Vec<Timestamp>,
    last_access: Option<Timestamp>,
}

impl UrlAcc {
    fn observe(&mut self, r: &LogRecord) {
        self.hits += 1;
        if r.is_bot {
            self.bot_hits += 1;
        } else {
            self.human_hits += 1;
        }
        self.codes.add(&r.status_code);
        self.total_bytes += u128::from(r.bytes_sent);
        if let Some(t) = r.timestamp {
            self.times.push(t);
            if self.last_access.map_or(true, |l| t > l) {
                self.last_access = Some(t);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlRow {
    pub url: String,
    pub hits: u64,
    pub bot_hits: u64,
    pub human_hits: u64,
    pub status_codes: String,
    pub avg_bytes: u64,
    pub avg_interval: Option<String>,
    pub last_access: Option<Timestamp>,
}

pub fn urls_report(records: &[LogRecord]) -> Vec<UrlRow> {
    let mut groups: OrderedGroups<String, UrlAcc> = OrderedGroups::new();
    for r in records {
        groups.entry(&r.url).observe(r);
    }
    groups
        .into_sorted_by_desc(|g| g.hits)
        .into_iter()
        .map(|(url, g)| UrlRow {
            url,
            hits: g.hits,
            bot_hits: g.bot_hits,
            human_hits: g.human_hits,
            status_codes: aggregate::status_distribution(&g.codes),
            avg_bytes: avg_bytes(g.total_bytes, g.hits),
            avg_interval: temporal::average_interval(&g.times),
            last_access: g.last_access,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// per bot

#[derive(Debug, Default)]
struct BotAcc {
    category: Option<BotCategory>,
    hits: u64,
    urls: AHashSet<String>,
    codes: OrderedCounter<u16>,
    total_bytes: u128,
    seen: SeenRange,
    verified: bool,
    verified_count: u64,
    unverified_count: u64,
}

impl BotAcc {
    fn observe(&mut self, r: &LogRecord) {
        self.category = r.bot_category;
        self.hits += 1;
        if !self.urls.contains(&r.url) {
            self.urls.insert(r.url.clone());
        }
        self.codes.add(&r.status_code);
        self.total_bytes += u128::from(r.bytes_sent);
        self.seen.observe(r.timestamp);
        self.verified |= r.verified_bot;
        if r.verified_bot {
            self.verified_count += 1;
        } else if verify::is_verifiable_bot(&r.bot_name) {
            self.unverified_count += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotRow {
    pub bot_name: String,
    pub bot_category: Option<BotCategory>,
    pub hits: u64,
    pub unique_urls: usize,
    pub status_codes: String,
    pub avg_bytes: u64,
    pub first_seen: Option<Timestamp>,
    pub last_seen: Option<Timestamp>,
    pub verified: bool,
    /// Hits whose client address is inside the vendor's published ranges.
    pub verified_count: u64,
    /// Hits claiming a verifiable vendor name from outside those ranges.
    pub unverified_count: u64,
}

fn is_named_bot(r: &LogRecord) -> bool {
    r.is_bot && !r.bot_name.is_empty()
}

pub fn bots_report(records: &[LogRecord]) -> Vec<BotRow> {
    let mut groups: OrderedGroups<String, BotAcc> = OrderedGroups::new();
    for r in records.iter().filter(|r| is_named_bot(r)) {
        groups.entry(&r.bot_name).observe(r);
    }
    groups
        .into_sorted_by_desc(|g| g.hits)
        .into_iter()
        .map(|(bot_name, g)| BotRow {
            bot_name,
            bot_category: g.category,
            hits: g.hits,
            unique_urls: g.urls.len(),
            status_codes: aggregate::status_distribution(&g.codes),
            avg_bytes: avg_bytes(g.total_bytes, g.hits),
            first_seen: g.seen.first,
            last_seen: g.seen.last,
            verified: g.verified,
            verified_count: g.verified_count,
            unverified_count: g.unverified_count,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// per status code

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusRow {
    pub code: u16,
    pub count: u64,
    pub percentage: f64,
    pub top_urls: Vec<UrlHits>,
}

pub fn status_codes_report(records: &[LogRecord]) -> Vec<StatusRow> {
    let total = records.len() as u64;
    let mut by_code: BTreeMap<u16, (u64, OrderedCounter<String>)> = BTreeMap::new();
    for r in records {
        let (count, urls) = by_code.entry(r.status_code).or_default();
        *count += 1;
        urls.add(&r.url);
    }
    by_code
        .into_iter()
        .map(|(code, (count, urls))| StatusRow {
            code,
            count,
            percentage: aggregate::percentage(count, total),
            top_urls: UrlHits::from_counts(urls.top(STATUS_TOP_URLS)),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// per client identifier

#[derive(Debug, Default)]
struct IpAcc {
    hits: u64,
    is_bot: bool,
    bot_name: String,
    urls: AHashSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpRow {
    pub ip: String,
    pub hits: u64,
    pub is_bot: bool,
    pub bot_name: String,
    pub unique_urls: usize,
}

/// A record counts once for every identifier it lists. `is_bot` is set when any
/// request from the identifier was a bot; `bot_name` is the last bot seen.
pub fn ips_report(records: &[LogRecord]) -> Vec<IpRow> {
    let mut groups: OrderedGroups<String, IpAcc> = OrderedGroups::new();
    for r in records {
        for ip in &r.client_identifiers {
            let g = groups.entry(ip);
            g.hits += 1;
            if r.is_bot {
                g.is_bot = true;
                g.bot_name.clone_from(&r.bot_name);
            }
            if !g.urls.contains(&r.url) {
                g.urls.insert(r.url.clone());
            }
        }
    }
    groups
        .into_sorted_by_desc(|g| g.hits)
        .into_iter()
        .map(|(ip, g)| IpRow {
            ip,
            hits: g.hits,
            is_bot: g.is_bot,
            bot_name: g.bot_name,
            unique_urls: g.urls.len(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// per url with nested bot detail

#[derive(Debug, Default)]
struct UrlDetailAcc {
    url: UrlAcc,
    bots: OrderedGroups<String, BotAcc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlBotRow {
    pub bot_name: String,
    pub bot_category: Option<BotCategory>,
    pub hits: u64,
    pub status_codes: String,
    pub avg_bytes: u64,
    pub first_seen: Option<Timestamp>,
    pub last_seen: Option<Timestamp>,
    pub verified: bool,
    pub verified_count: u64,
    pub unverified_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlDetailRow {
    pub url: String,
    pub hits: u64,
    pub bot_hits: u64,
    pub human_hits: u64,
    pub status_codes: String,
    pub avg_bytes: u64,
    pub last_access: Option<Timestamp>,
    pub bot_count: usize,
    pub bots: Vec<UrlBotRow>,
}

pub fn urls_detail_report(records: &[LogRecord]) -> Vec<UrlDetailRow> {
    let mut groups: OrderedGroups<String, UrlDetailAcc> = OrderedGroups::new();
    for r in records {
        let g = groups.entry(&r.url);
        g.url.observe(r);
        if is_named_bot(r) {
            g.bots.entry(&r.bot_name).observe(r);
        }
    }
    groups
        .into_sorted_by_desc(|g| g.url.hits)
        .into_iter()
        .map(|(url, g)| {
            let bots: Vec<UrlBotRow> = g
                .bots
                .into_sorted_by_desc(|b| b.hits)
                .into_iter()
                .map(|(bot_name, b)| UrlBotRow {
                    bot_name,
                    bot_category: b.category,
                    hits: b.hits,
                    status_codes: aggregate::status_distribution(&b.codes),
                    avg_bytes: avg_bytes(b.total_bytes, b.hits),
                    first_seen: b.seen.first,
                    last_seen: b.seen.last,
                    verified: b.verified,
                    verified_count: b.verified_count,
                    unverified_count: b.unverified_count,
                })
                .collect();
            UrlDetailRow {
                url,
                hits: g.url.hits,
                bot_hits: g.url.bot_hits,
                human_hits: g.url.human_hits,
                status_codes: aggregate::status_distribution(&g.url.codes),
                avg_bytes: avg_bytes(g.url.total_bytes, g.url.hits),
                last_access: g.url.last_access,
                bot_count: bots.len(),
                bots,
            }
        })
        .collect()
}

/// Sorted, de-duplicated bot names across all nested bot rows.
pub fn bot_names(rows: &[UrlDetailRow]) -> Vec<String> {
    let mut names: Vec<String> = rows
        .iter()
        .flat_map(|r| r.bots.iter().map(|b| b.bot_name.clone()))
        .collect();
    names.sort();
    names.dedup();
    names
}

// ---------------------------------------------------------------------------
// crawl frequency

#[derive(Debug, Default)]
struct CrawlAcc {
    times: Vec<Timestamp>,
    last: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlRow {
    pub url: String,
    pub crawl_count: usize,
    pub avg_interval: Option<String>,
    pub last_crawl: Option<Timestamp>,
}

/// Bot traffic only. `crawl_count` counts bot hits that carry a timestamp.
pub fn crawl_frequency_report(records: &[LogRecord]) -> Vec<CrawlRow> {
    let mut groups: OrderedGroups<String, CrawlAcc> = OrderedGroups::new();
    for r in records.iter().filter(|r| r.is_bot) {
        let g = groups.entry(&r.url);
        if let Some(t) = r.timestamp {
            g.times.push(t);
            if g.last.map_or(true, |l| t > l) {
                g.last = Some(t);
            }
        }
    }
    groups
        .into_sorted_by_desc(|g| g.times.len())
        .into_iter()
        .map(|(url, g)| CrawlRow {
            url,
            crawl_count: g.times.len(),
            avg_interval: temporal::average_interval(&g.times),
            last_crawl: g.last,
        })
        .collect()
}

// ---------------------------------------------------------------------------

/// All reports over one record set, built concurrently.
#[derive(Debug, Clone, Serialize)]
pub struct AllReports {
    pub summary: Option<TrafficSummary>,
    pub urls: Vec<UrlDetailRow>,
    pub bots: Vec<BotRow>,
    pub status_codes: Vec<StatusRow>,
    pub ips: Vec<IpRow>,
    pub crawl_frequency: Vec<CrawlRow>,
}

impl AllReports {
    pub fn build(records: &[LogRecord]) -> Self {
        let ((summary, urls), ((bots, status_codes), (ips, crawl_frequency))) = rayon::join(
            || rayon::join(|| summary(records), || urls_detail_report(records)),
            || {
                rayon::join(
                    || rayon::join(|| bots_report(records), || status_codes_report(records)),
                    || rayon::join(|| ips_report(records), || crawl_frequency_report(records)),
                )
            },
        );
        Self { summary, urls, bots, status_codes, ips, crawl_frequency }
    }
}
