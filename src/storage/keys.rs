//! Names of persisted keys
//!
//! The names match the keys the desktop front end uses in its local
//! storage, so a store file can be shared between the two.

pub const DAILY_USAGE_COUNT: &str = "dailyUsageCount";
pub const DAILY_USAGE_DATE: &str = "dailyUsageDate";
pub const CHAT_HISTORY_LIST: &str = "chatHistoryList";
pub const ASK_HISTORY_LIST: &str = "historyList";
pub const PROMPT_LIST: &str = "promptList";
pub const SELECTED_PROMPT: &str = "selectedPrompt";
pub const RECENT_PROMPTS: &str = "recentPrompts";
pub const OCR_LANG: &str = "OCRLang";
pub const OPENAI_API_KEY: &str = "openai_api_key";
