//! Robots.txt rules
//!
//! Matching itself is delegated to the robotstxt crate; this module decides
//! what a fetch outcome means for a whole host.

use robotstxt::DefaultMatcher;

/// Robots exclusion rules for one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotsRules {
    /// No usable robots.txt: everything may be fetched
    AllowAll,
    /// robots.txt is access-restricted (401/403): nothing may be fetched
    DenyAll,
    /// Raw robots.txt body
    Parsed(String),
}

impl RobotsRules {
    /// Maps a robots.txt response to rules
    ///
    /// # Arguments
    ///
    /// * `status` - HTTP status of the robots.txt request
    /// * `body` - Response body (ignored unless the status is a success)
    pub fn from_response(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::DenyAll,
            200..=299 if !body.trim().is_empty() => Self::Parsed(body.to_string()),
            _ => Self::AllowAll,
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The full URL to check
    /// * `user_agent` - The product token matched against `User-agent` lines
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::DenyAll => false,
            Self::Parsed(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, user_agent, url)
            }
        }
    }
}
