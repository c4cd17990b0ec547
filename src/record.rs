use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotCategory {
    SearchEngine,
    Llm,
    SeoTool,
    Social,
    HttpClient,
    Generic,
}

impl BotCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotCategory::SearchEngine => "search_engine",
            BotCategory::Llm => "llm",
            BotCategory::SeoTool => "seo_tool",
            BotCategory::Social => "social",
            BotCategory::HttpClient => "http_client",
            BotCategory::Generic => "generic",
        }
    }
}

impl fmt::Display for BotCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed and classified access-log line.
///
/// Classification fields are filled in by the parser at construction time and
/// never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub server: String,
    pub domain: String,
    pub client_identifiers: Vec<String>, // first entry is the canonical client address
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub method: String,
    pub url: String,
    pub protocol: String,
    pub status_code: u16,
    pub bytes_sent: u64,
    pub referer: String,
    pub user_agent: String,
    pub extra_id: String,
    pub is_bot: bool,
    pub bot_name: String,
    pub bot_category: Option<BotCategory>,
    pub verified_bot: bool,
}

impl LogRecord {
    pub fn client_address(&self) -> Option<&str> {
        self.client_identifiers.first().map(|s| s.as_str())
    }

    pub fn category_str(&self) -> &'static str {
        self.bot_category.map(|c| c.as_str()).unwrap_or("")
    }
}
