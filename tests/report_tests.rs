use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};
use crawlscope::reports::{self, AllReports};
use crawlscope::{BotCategory, LogRecord};

fn t0() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

fn human(url: &str, ip: &str, secs: Option<i64>, status: u16, bytes: u64) -> LogRecord {
    LogRecord {
        server: "s1".into(),
        domain: "example.com".into(),
        client_identifiers: ip.split(',').map(|s| s.trim().to_string()).collect(),
        timestamp: secs.map(|s| t0() + Duration::seconds(s)),
        method: "GET".into(),
        url: url.into(),
        protocol: "HTTP/1.1".into(),
        status_code: status,
        bytes_sent: bytes,
        referer: "-".into(),
        user_agent: "Mozilla/5.0".into(),
        extra_id: "-".into(),
        is_bot: false,
        bot_name: String::new(),
        bot_category: None,
        verified_bot: false,
    }
}

fn bot(url: &str, ip: &str, secs: Option<i64>, name: &str, cat: BotCategory, verified: bool) -> LogRecord {
    LogRecord {
        user_agent: name.into(),
        is_bot: true,
        bot_name: name.into(),
        bot_category: Some(cat),
        verified_bot: verified,
        ..human(url, ip, secs, 200, 1000)
    }
}

#[test]
fn empty_input_gives_empty_reports() {
    assert!(reports::summary(&[]).is_none());
    assert!(reports::urls_report(&[]).is_empty());
    assert!(reports::bots_report(&[]).is_empty());
    assert!(reports::status_codes_report(&[]).is_empty());
    assert!(reports::ips_report(&[]).is_empty());
    assert!(reports::urls_detail_report(&[]).is_empty());
    assert!(reports::crawl_frequency_report(&[]).is_empty());
}

#[test]
fn summary_counts_and_top_lists() {
    let mut recs = vec![
        human("/a", "1.1.1.1", Some(0), 200, 100),
        human("/a", "1.1.1.1, 2.2.2.2", Some(60), 404, 300),
        bot("/b", "3.3.3.3", Some(86_400), "Googlebot", BotCategory::SearchEngine, true),
        bot("/a", "3.3.3.3", None, "GPTBot", BotCategory::Llm, false),
    ];
    for i in 0..12 {
        recs.push(human(&format!("/p{i}"), "4.4.4.4", Some(86_400 * 2), 200, 0));
    }
    let s = reports::summary(&recs).unwrap();
    assert_eq!(s.total_requests, 16);
    assert_eq!(s.unique_urls, 14);
    assert_eq!(s.unique_ips, 4);
    assert_eq!(s.bot_requests, 2);
    assert_eq!(s.human_requests, 14);
    assert_eq!(s.verified_bot_requests, 1);
    assert_eq!(s.unique_bots, 2);
    assert_eq!(s.bot_percentage, 12.5);
    assert_eq!(s.total_bytes, 2400);

    assert_eq!(s.status_distribution[0].code, 200);
    assert_eq!(s.status_distribution[0].count, 15);
    assert_eq!(s.status_distribution[1].code, 404);

    assert_eq!(s.top_urls.len(), 10);
    assert_eq!(s.top_urls[0].url, "/a");
    assert_eq!(s.top_urls[0].hits, 3);
    // ties keep first-seen order
    assert_eq!(s.top_urls[1].url, "/b");
    assert_eq!(s.top_urls[2].url, "/p0");

    let bots: Vec<&str> = s.top_bots.iter().map(|b| b.bot_name.as_str()).collect();
    assert_eq!(bots, vec!["Googlebot", "GPTBot"]);

    let days: Vec<(NaiveDate, u64)> = s.hits_per_day.iter().map(|d| (d.date, d.hits)).collect();
    assert_eq!(
        days,
        vec![
            (NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 2),
            (NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(), 1),
            (NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(), 12),
        ]
    );
}

#[test]
fn hits_per_day_uses_local_date() {
    let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
    let mut r = human("/a", "1.1.1.1", None, 200, 0);
    // 23:30 UTC on the 1st is already the 2nd at +02:00
    r.timestamp = Some(plus_two.with_ymd_and_hms(2024, 3, 2, 1, 30, 0).unwrap());
    let s = reports::summary(&[r]).unwrap();
    assert_eq!(s.hits_per_day[0].date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
}

#[test]
fn urls_report_rows() {
    let recs = vec![
        human("/a", "1.1.1.1", Some(0), 200, 100),
        bot("/b", "2.2.2.2", Some(5), "curl", BotCategory::HttpClient, false),
        human("/a", "1.1.1.1", Some(150), 404, 300),
        bot("/a", "3.3.3.3", Some(300), "Googlebot", BotCategory::SearchEngine, false),
        human("/c", "1.1.1.1", None, 200, 7),
    ];
    let rows = reports::urls_report(&recs);
    let order: Vec<&str> = rows.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(order, vec!["/a", "/b", "/c"]);

    let a = &rows[0];
    assert_eq!(a.hits, 3);
    assert_eq!(a.bot_hits, 1);
    assert_eq!(a.human_hits, 2);
    assert_eq!(a.status_codes, "200:2, 404:1");
    assert_eq!(a.avg_bytes, (100 + 300 + 1000) / 3);
    assert_eq!(a.avg_interval.as_deref(), Some("2.5m"));
    assert_eq!(a.last_access, Some(t0() + Duration::seconds(300)));

    let c = &rows[2];
    assert_eq!(c.avg_interval, None);
    assert_eq!(c.last_access, None);
    assert_eq!(c.avg_bytes, 7);
}

#[test]
fn avg_bytes_of_two_hits() {
    let recs = vec![human("/x", "1.1.1.1", None, 200, 100), human("/x", "1.1.1.1", None, 200, 300)];
    assert_eq!(reports::urls_report(&recs)[0].avg_bytes, 200);
}

#[test]
fn bots_report_rows() {
    let recs = vec![
        bot("/a", "66.249.64.1", Some(100), "Googlebot", BotCategory::SearchEngine, false),
        bot("/b", "66.249.64.1", Some(50), "Googlebot", BotCategory::SearchEngine, true),
        bot("/a", "66.249.64.1", Some(200), "Googlebot", BotCategory::SearchEngine, false),
        human("/a", "1.1.1.1", Some(0), 200, 10),
        bot("/z", "9.9.9.9", None, "curl", BotCategory::HttpClient, false),
    ];
    let rows = reports::bots_report(&recs);
    assert_eq!(rows.len(), 2);
    let g = &rows[0];
    assert_eq!(g.bot_name, "Googlebot");
    assert_eq!(g.bot_category, Some(BotCategory::SearchEngine));
    assert_eq!(g.hits, 3);
    assert_eq!(g.unique_urls, 2);
    assert_eq!(g.status_codes, "200:3");
    assert_eq!(g.avg_bytes, 1000);
    assert_eq!(g.first_seen, Some(t0() + Duration::seconds(50)));
    assert_eq!(g.last_seen, Some(t0() + Duration::seconds(200)));
    assert!(g.verified);

    let c = &rows[1];
    assert_eq!(c.bot_name, "curl");
    assert!(!c.verified);
    assert_eq!(c.first_seen, None);
}

#[test]
fn status_codes_report_rows() {
    let mut recs = Vec::new();
    for i in 0..7 {
        recs.push(human(&format!("/u{}", i % 6), "1.1.1.1", None, 200, 0));
    }
    recs.push(human("/missing", "1.1.1.1", None, 404, 0));
    recs.push(human("/missing", "1.1.1.1", None, 404, 0));
    recs.push(human("/boom", "1.1.1.1", None, 500, 0));

    let rows = reports::status_codes_report(&recs);
    let codes: Vec<u16> = rows.iter().map(|r| r.code).collect();
    assert_eq!(codes, vec![200, 404, 500]);

    assert_eq!(rows[0].count, 7);
    assert_eq!(rows[0].percentage, 70.0);
    assert_eq!(rows[0].top_urls.len(), 5);
    assert_eq!(rows[0].top_urls[0].url, "/u0");
    assert_eq!(rows[0].top_urls[0].hits, 2);
    assert_eq!(rows[0].top_urls[1].url, "/u1");

    assert_eq!(rows[1].percentage, 20.0);
    assert_eq!(rows[1].top_urls[0].hits, 2);
    assert_eq!(rows[2].percentage, 10.0);
}

#[test]
fn status_percentages_sum_to_hundred() {
    let mut recs = Vec::new();
    for (i, code) in [200u16, 200, 301, 404, 404, 404, 500].iter().enumerate() {
        recs.push(human(&format!("/{i}"), "1.1.1.1", None, *code, 0));
    }
    let total: f64 = reports::status_codes_report(&recs).iter().map(|r| r.percentage).sum();
    assert!((total - 100.0).abs() < 0.05, "{total}");
}

#[test]
fn ips_report_counts_every_identifier() {
    let recs = vec![
        human("/a", "1.1.1.1, 10.0.0.1", None, 200, 0),
        human("/b", "1.1.1.1", None, 200, 0),
        bot("/c", "10.0.0.1", None, "curl", BotCategory::HttpClient, false),
        bot("/c", "10.0.0.1", None, "Wget", BotCategory::HttpClient, false),
        human("/d", "10.0.0.1", None, 200, 0),
    ];
    let rows = reports::ips_report(&recs);
    assert_eq!(rows[0].ip, "10.0.0.1");
    assert_eq!(rows[0].hits, 4);
    assert!(rows[0].is_bot);
    assert_eq!(rows[0].bot_name, "Wget");
    assert_eq!(rows[0].unique_urls, 3);

    assert_eq!(rows[1].ip, "1.1.1.1");
    assert_eq!(rows[1].hits, 2);
    assert!(!rows[1].is_bot);
    assert_eq!(rows[1].bot_name, "");
}

#[test]
fn url_detail_nests_bots_per_url() {
    let recs = vec![
        human("/a", "1.1.1.1", Some(0), 200, 100),
        bot("/a", "2.2.2.2", Some(10), "curl", BotCategory::HttpClient, false),
        bot("/a", "3.3.3.3", Some(20), "Googlebot", BotCategory::SearchEngine, true),
        bot("/a", "3.3.3.3", Some(30), "Googlebot", BotCategory::SearchEngine, false),
        bot("/b", "3.3.3.3", Some(40), "Googlebot", BotCategory::SearchEngine, false),
    ];
    let rows = reports::urls_detail_report(&recs);
    assert_eq!(rows.len(), 2);
    let a = &rows[0];
    assert_eq!(a.url, "/a");
    assert_eq!(a.hits, 4);
    assert_eq!(a.bot_hits, 3);
    assert_eq!(a.human_hits, 1);
    assert_eq!(a.bot_count, 2);
    assert_eq!(a.last_access, Some(t0() + Duration::seconds(30)));
    assert_eq!(a.bots[0].bot_name, "Googlebot");
    assert_eq!(a.bots[0].hits, 2);
    assert!(a.bots[0].verified);
    assert_eq!(a.bots[0].first_seen, Some(t0() + Duration::seconds(20)));
    assert_eq!(a.bots[1].bot_name, "curl");
    assert_eq!(a.bots[1].bot_category, Some(BotCategory::HttpClient));

    // the /b group owns its own Googlebot row, unaffected by /a's verified hit
    let b = &rows[1];
    assert_eq!(b.bots.len(), 1);
    assert!(!b.bots[0].verified);
    assert_eq!(b.bots[0].hits, 1);

    assert_eq!(reports::bot_names(&rows), vec!["Googlebot".to_string(), "curl".to_string()]);
}

#[test]
fn crawl_frequency_uses_bot_hits_only() {
    let recs = vec![
        bot("/a", "3.3.3.3", Some(0), "Googlebot", BotCategory::SearchEngine, false),
        human("/a", "1.1.1.1", Some(10), 200, 0),
        bot("/a", "3.3.3.3", Some(3600), "Googlebot", BotCategory::SearchEngine, false),
        bot("/a", "3.3.3.3", Some(7200), "GPTBot", BotCategory::Llm, false),
        bot("/b", "3.3.3.3", Some(5), "curl", BotCategory::HttpClient, false),
        bot("/c", "3.3.3.3", None, "curl", BotCategory::HttpClient, false),
        human("/d", "1.1.1.1", Some(0), 200, 0),
    ];
    let rows = reports::crawl_frequency_report(&recs);
    let order: Vec<&str> = rows.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(order, vec!["/a", "/b", "/c"]);
    assert_eq!(rows[0].crawl_count, 3);
    assert_eq!(rows[0].avg_interval.as_deref(), Some("1.0h"));
    assert_eq!(rows[0].last_crawl, Some(t0() + Duration::seconds(7200)));
    assert_eq!(rows[1].crawl_count, 1);
    assert_eq!(rows[1].avg_interval, None);
    assert_eq!(rows[2].crawl_count, 0);
    assert_eq!(rows[2].last_crawl, None);
}

#[test]
fn all_reports_match_individual_builders() {
    let recs = vec![
        human("/a", "1.1.1.1", Some(0), 200, 100),
        bot("/a", "3.3.3.3", Some(20), "Googlebot", BotCategory::SearchEngine, true),
        bot("/b", "2.2.2.2", Some(40), "curl", BotCategory::HttpClient, false),
    ];
    let all = AllReports::build(&recs);
    assert_eq!(all.summary, reports::summary(&recs));
    assert_eq!(all.urls, reports::urls_detail_report(&recs));
    assert_eq!(all.bots, reports::bots_report(&recs));
    assert_eq!(all.status_codes, reports::status_codes_report(&recs));
    assert_eq!(all.ips, reports::ips_report(&recs));
    assert_eq!(all.crawl_frequency, reports::crawl_frequency_report(&recs));
}

#[test]
fn rows_serialize_with_stable_field_names() {
    let recs = vec![bot("/a", "3.3.3.3", Some(0), "Googlebot", BotCategory::SearchEngine, true)];
    let v = serde_json::to_value(reports::bots_report(&recs)).unwrap();
    assert_eq!(v[0]["bot_name"], "Googlebot");
    assert_eq!(v[0]["bot_category"], "search_engine");
    assert_eq!(v[0]["verified"], true);
    assert_eq!(v[0]["first_seen"], "2024-03-01T10:00:00+00:00");
}

#[test]
fn byte_totals_do_not_overflow() {
    let lines = vec![
        r#"[s]:::[d.com]:::1.1.1.1 - - [01/Jan/2024:12:00:00 +0000] "GET /a HTTP/1.1" 200 18446744073709551615 "-" "curl/8.0" "-""#,
        r#"[s]:::[d.com]:::1.1.1.1 - - [01/Jan/2024:12:00:01 +0000] "GET /a HTTP/1.1" 200 18446744073709551615 "-" "curl/8.0" "-""#,
    ];
    let recs = crawlscope::parser::parse_lines(lines, &crawlscope::verify::VerifiedNetworkCache::disabled()).records;
    assert_eq!(recs.len(), 2);

    assert_eq!(reports::urls_report(&recs)[0].avg_bytes, u64::MAX);
    assert_eq!(reports::bots_report(&recs)[0].avg_bytes, u64::MAX);
    assert_eq!(reports::urls_detail_report(&recs)[0].bots[0].avg_bytes, u64::MAX);
    assert_eq!(reports::summary(&recs).unwrap().total_bytes, 2 * u128::from(u64::MAX));
}

#[test]
fn summary_breakdowns() {
    let mut post = human("/form", "1.1.1.1", Some(3600), 200, 0);
    post.method = "POST".into();
    post.domain = "other.org".into();
    post.server = "s2".into();
    let recs = vec![
        human("/a", "1.1.1.1", Some(0), 200, 0),
        bot("/a", "3.3.3.3", Some(1800), "Googlebot", BotCategory::SearchEngine, true),
        bot("/a", "4.4.4.4", Some(1900), "GPTBot", BotCategory::Llm, false),
        bot("/b", "4.4.4.4", None, "GPTBot", BotCategory::Llm, false),
        post,
    ];
    let s = reports::summary(&recs).unwrap();
    let pairs = |v: &[reports::LabelHits]| -> Vec<(String, u64)> { v.iter().map(|l| (l.label.clone(), l.hits)).collect() };

    assert_eq!(pairs(&s.hits_by_category), vec![("llm".to_string(), 2), ("search_engine".to_string(), 1)]);
    assert_eq!(pairs(&s.hits_by_method), vec![("GET".to_string(), 4), ("POST".to_string(), 1)]);
    assert_eq!(pairs(&s.hits_by_domain), vec![("example.com".to_string(), 4), ("other.org".to_string(), 1)]);
    assert_eq!(pairs(&s.hits_by_server), vec![("s1".to_string(), 4), ("s2".to_string(), 1)]);
    assert_eq!(
        pairs(&s.hits_per_hour),
        vec![("2024-03-01 10:00".to_string(), 3), ("2024-03-01 11:00".to_string(), 1)]
    );
}

#[test]
fn bot_rows_split_verified_and_unverified_hits() {
    let recs = vec![
        bot("/a", "66.249.64.1", Some(0), "Googlebot", BotCategory::SearchEngine, true),
        bot("/a", "203.0.113.5", Some(1), "Googlebot", BotCategory::SearchEngine, false),
        bot("/b", "203.0.113.5", Some(2), "Googlebot", BotCategory::SearchEngine, false),
        bot("/a", "203.0.113.6", Some(3), "GPTBot", BotCategory::Llm, false),
    ];
    let rows = reports::bots_report(&recs);
    assert_eq!(rows[0].bot_name, "Googlebot");
    assert_eq!(rows[0].verified_count, 1);
    assert_eq!(rows[0].unverified_count, 2);
    // names outside the verifiable vendor set are neither
    assert_eq!(rows[1].verified_count, 0);
    assert_eq!(rows[1].unverified_count, 0);

    let detail = reports::urls_detail_report(&recs);
    assert_eq!(detail[0].bots[0].verified_count, 1);
    assert_eq!(detail[0].bots[0].unverified_count, 1);
}
