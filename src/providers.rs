//! LLM providers known to `list-providers`. Only key presence is checked; no requests are made.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
    Mistral,
    Local,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::Google,
        Provider::Mistral,
        Provider::Local,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::Mistral => "mistral",
            Provider::Local => "local",
        }
    }

    pub fn from_id(s: &str) -> Option<Provider> {
        let s = s.trim().to_lowercase();
        Provider::ALL.into_iter().find(|p| p.id() == s)
    }

    /// Environment variable holding the API key. Local models need none.
    pub fn env_var(self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::Google => Some("GOOGLE_API_KEY"),
            Provider::Mistral => Some("MISTRAL_API_KEY"),
            Provider::Local => None,
        }
    }

    /// True when the key variable is set and non-blank (always true for `local`).
    pub fn is_configured(self) -> bool {
        self.is_configured_with(|name| std::env::var(name).ok())
    }

    fn is_configured_with(self, lookup: impl Fn(&str) -> Option<String>) -> bool {
        match self.env_var() {
            Some(name) => lookup(name).is_some_and(|v| !v.trim().is_empty()),
            None => true,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
