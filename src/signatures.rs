//! User-agent classification against an ordered signature table.
//!
//! The table is scanned top to bottom and the first signature whose needle
//! occurs in the user agent wins. Vendor-specific entries must therefore sit
//! above anything that would also match their agents (e.g. `Googlebot-Image`
//! above `Googlebot`).

use crate::record::BotCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub needle: &'static str,
    pub name: &'static str,
    pub category: BotCategory,
}

const fn sig(needle: &'static str, name: &'static str, category: BotCategory) -> Signature {
    Signature { needle, name, category }
}

use BotCategory::*;

pub static BOT_SIGNATURES: &[Signature] = &[
    // search engines
    sig("Googlebot-Image", "Googlebot-Image", SearchEngine),
    sig("Googlebot-Video", "Googlebot-Video", SearchEngine),
    sig("Googlebot-News", "Googlebot-News", SearchEngine),
    sig("Googlebot", "Googlebot", SearchEngine),
    sig("Google-InspectionTool", "Google-InspectionTool", SearchEngine),
    sig("Storebot-Google", "Storebot-Google", SearchEngine),
    sig("AdsBot-Google", "AdsBot-Google", SearchEngine),
    sig("Mediapartners-Google", "Mediapartners-Google", SearchEngine),
    sig("APIs-Google", "APIs-Google", SearchEngine),
    sig("bingbot", "Bingbot", SearchEngine),
    sig("YandexBot", "YandexBot", SearchEngine),
    sig("Baiduspider", "Baiduspider", SearchEngine),
    sig("DuckDuckBot", "DuckDuckBot", SearchEngine),
    sig("Applebot", "Applebot", SearchEngine),
    // llm
    sig("GPTBot", "GPTBot", Llm),
    sig("ChatGPT-User", "ChatGPT-User", Llm),
    sig("OAI-SearchBot", "OAI-SearchBot", Llm),
    sig("ClaudeBot", "ClaudeBot", Llm),
    sig("Claude-Web", "Claude-Web", Llm),
    sig("anthropic-ai", "Anthropic", Llm),
    sig("Bytespider", "Bytespider", Llm),
    sig("DeepSeekBot", "DeepSeekBot", Llm),
    sig("PerplexityBot", "PerplexityBot", Llm),
    sig("Meta-ExternalAgent", "Meta AI Bot", Llm),
    sig("Google-Extended", "Google-Extended", Llm),
    // seo
    sig("AhrefsBot", "AhrefsBot", SeoTool),
    sig("SemrushBot", "SemrushBot", SeoTool),
    sig("MJ12bot", "MJ12bot", SeoTool),
    sig("Screaming Frog", "Screaming Frog", SeoTool),
    sig("DotBot", "DotBot", SeoTool),
    // social
    sig("facebookexternalhit", "Facebook", Social),
    sig("Twitterbot", "Twitterbot", Social),
    sig("LinkedInBot", "LinkedInBot", Social),
    // http clients
    sig("python-requests", "python-requests", HttpClient),
    sig("Apache-HttpClient", "Apache-HttpClient", HttpClient),
    sig("Go-http-client", "Go-http-client", HttpClient),
    sig("curl", "curl", HttpClient),
    sig("Wget", "Wget", HttpClient),
];

/// Lower-case fragments checked only after every signature missed.
pub static GENERIC_BOT_PATTERNS: &[&str] = &["bot", "crawl", "spider", "scraper"];

pub const GENERIC_BOT_NAME: &str = "generic-bot";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub is_bot: bool,
    pub bot_name: &'static str,
    pub category: Option<BotCategory>,
}

impl Classification {
    pub const HUMAN: Classification = Classification { is_bot: false, bot_name: "", category: None };

    fn bot(name: &'static str, category: BotCategory) -> Self {
        Classification { is_bot: true, bot_name: name, category: Some(category) }
    }
}

pub fn classify(user_agent: &str) -> Classification {
    classify_with(BOT_SIGNATURES, GENERIC_BOT_PATTERNS, user_agent)
}

/// Classification over an explicit table; `classify` uses the built-in one.
pub fn classify_with(signatures: &[Signature], generic: &[&str], user_agent: &str) -> Classification {
    if user_agent.is_empty() || user_agent == "-" {
        return Classification::HUMAN;
    }
    if let Some(s) = signatures.iter().find(|s| user_agent.contains(s.needle)) {
        return Classification::bot(s.name, s.category);
    }
    let lowered = user_agent.to_lowercase();
    if generic.iter().any(|p| lowered.contains(p)) {
        return Classification::bot(GENERIC_BOT_NAME, BotCategory::Generic);
    }
    Classification::HUMAN
}
