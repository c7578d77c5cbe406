//! Price fetcher implementations.

use crate::types::PriceObservation;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Categorized fetch failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The proxy or the page could not be reached
    #[error("Network failure: {0}")]
    Network(String),

    /// The page is a captcha challenge instead of the product page
    #[error("Website is showing CAPTCHA - automated access temporarily blocked")]
    CaptchaBlocked,

    /// The page loaded but no price could be extracted
    #[error("Price not found: {0}")]
    PriceNotFound(String),
}

impl FetchError {
    /// Stable label used in logs and metrics
    pub fn category(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::CaptchaBlocked => "captcha",
            FetchError::PriceNotFound(_) => "price_not_found",
        }
    }
}

/// Price fetcher trait
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// Fetch the current price and display name of a product page
    async fn fetch(&self, url: &str) -> Result<PriceObservation, FetchError>;

    /// Get the name of this fetcher
    fn name(&self) -> &str;
}

/// FlareSolverr connection settings
#[derive(Debug, Clone)]
pub struct FlareSolverrConfig {
    /// FlareSolverr API endpoint
    pub endpoint: String,

    /// Persistent browser session name, `None` to run without a session
    pub session: Option<String>,

    /// Budget FlareSolverr gets to solve a page
    pub max_timeout: Duration,

    /// HTTP timeout for page requests, slightly above `max_timeout`
    pub request_timeout: Duration,

    /// HTTP timeout for session creation
    pub session_timeout: Duration,
}

impl Default for FlareSolverrConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8191/v1".to_string(),
            session: Some("pricewatch".to_string()),
            max_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(70),
            session_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SolverResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    solution: Option<Solution>,
}

#[derive(Debug, Deserialize)]
struct Solution {
    response: String,
}

/// Fetches product pages through a FlareSolverr instance
///
/// The browser session is created lazily, reused across fetches and dropped
/// after a network-level failure so the next fetch starts a fresh one.
pub struct FlareSolverrFetcher {
    config: FlareSolverrConfig,
    client: reqwest::Client,
    session: Mutex<Option<String>>,
}

impl FlareSolverrFetcher {
    /// Create a new FlareSolverr fetcher
    pub fn new(config: FlareSolverrConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            config,
            client,
            session: Mutex::new(None),
        })
    }

    /// Session currently in use, if any
    pub async fn active_session(&self) -> Option<String> {
        self.session.lock().await.clone()
    }

    async fn ensure_session(&self) -> Option<String> {
        let name = self.config.session.as_ref()?;
        let mut session = self.session.lock().await;
        if session.is_none() {
            match self.create_session(name).await {
                Ok(()) => {
                    info!(session = %name, "Created FlareSolverr session");
                    *session = Some(name.clone());
                }
                Err(e) => {
                    warn!(session = %name, error = %e, "Could not create FlareSolverr session");
                }
            }
        }
        session.clone()
    }

    async fn create_session(&self, name: &str) -> Result<(), String> {
        let payload = json!({ "cmd": "sessions.create", "session": name });
        let response = self
            .client
            .post(&self.config.endpoint)
            .timeout(self.config.session_timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let body: SolverResponse = response.json().await.map_err(|e| e.to_string())?;
        if status.is_success() && body.status == "ok" {
            Ok(())
        } else {
            Err(format!("status {}: {}", status.as_u16(), body.message))
        }
    }

    async fn request_page(&self, url: &str, session: Option<&str>) -> Result<String, String> {
        let mut payload = json!({
            "cmd": "request.get",
            "url": url,
            "maxTimeout": self.config.max_timeout.as_millis() as u64,
        });
        if let Some(session) = session {
            payload["session"] = json!(session);
        }

        let response = self
            .client
            .post(&self.config.endpoint)
            .timeout(self.config.request_timeout)
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| format!("Flaresolverr error: {}", e))?;

        let body: SolverResponse = response
            .json()
            .await
            .map_err(|e| format!("Flaresolverr error: {}", e))?;

        body.solution
            .map(|s| s.response)
            .ok_or_else(|| format!("Flaresolverr error: no solution ({})", body.message))
    }
}

#[async_trait]
impl PriceFetcher for FlareSolverrFetcher {
    async fn fetch(&self, url: &str) -> Result<PriceObservation, FetchError> {
        let start = Instant::now();
        let session = self.ensure_session().await;

        let html = match self.request_page(url, session.as_deref()).await {
            Ok(html) => html,
            Err(e) => {
                if session.is_some() {
                    *self.session.lock().await = None;
                }
                return Err(FetchError::Network(e));
            }
        };

        let observation = extract_observation(&html, url)?;
        debug!(
            url,
            price = observation.price,
            duration_ms = start.elapsed().as_millis(),
            "Fetched product page"
        );
        Ok(observation)
    }

    fn name(&self) -> &str {
        "flaresolverr"
    }
}

static PRICE_ELEMENTS: LazyLock<Vec<ElementPattern>> = LazyLock::new(|| {
    ["p", "span", "div"]
        .iter()
        .map(|tag| ElementPattern::new(tag, "price"))
        .collect()
});

static NAME_ELEMENT: LazyLock<ElementPattern> = LazyLock::new(|| ElementPattern::new("h1", "name"));

static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"));

/// First `<tag class="... class ...">` element, matched up to its balanced closing tag
struct ElementPattern {
    open: Regex,
    same_tag: Regex,
}

impl ElementPattern {
    fn new(tag: &str, class: &str) -> Self {
        let open = format!(
            r#"(?is)<{tag}\b[^>]*\bclass\s*=\s*["'](?:[^"']*\s)?{class}(?:\s[^"']*)?["'][^>]*>"#
        );
        let same_tag = format!(r"(?is)<(/?){tag}\b[^>]*>");
        Self {
            open: Regex::new(&open).expect("valid regex"),
            same_tag: Regex::new(&same_tag).expect("valid regex"),
        }
    }

    /// Markup between the opening tag and its matching close
    fn inner<'a>(&self, html: &'a str) -> Option<&'a str> {
        let start = self.open.find(html)?.end();
        let rest = &html[start..];
        let mut depth = 1usize;
        for tag in self.same_tag.captures_iter(rest) {
            let whole = tag.get(0)?;
            if &tag[1] == "/" {
                depth -= 1;
                if depth == 0 {
                    return Some(&rest[..whole.start()]);
                }
            } else if !whole.as_str().ends_with("/>") {
                depth += 1;
            }
        }
        None
    }

    /// Visible text of the element with entities decoded and whitespace collapsed
    fn text(&self, html: &str) -> Option<String> {
        let inner = self.inner(html)?;
        let text = TAGS.replace_all(inner, " ");
        let text = text
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">");
        Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

/// Keep only the digits of a price text, e.g. `"3 000 €"` becomes 3000.
///
/// Text without digits yields 0; `None` means the digits do not fit a `u64`.
pub fn parse_price(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse().ok()
}

/// Extract price and name from a product page.
///
/// The name falls back to the URL when the page has none.
pub fn extract_observation(html: &str, url: &str) -> Result<PriceObservation, FetchError> {
    let lower = html.to_lowercase();
    if lower.contains("captcha") {
        return Err(FetchError::CaptchaBlocked);
    }

    let Some(price_text) = PRICE_ELEMENTS.iter().find_map(|p| p.text(html)) else {
        let hints = lower.matches('€').count() + lower.matches("euro").count();
        let reason = if hints > 0 {
            format!("price element structure changed - found {hints} price-like elements")
        } else {
            "page structure may have changed".to_string()
        };
        return Err(FetchError::PriceNotFound(reason));
    };

    let price = parse_price(&price_text)
        .ok_or_else(|| FetchError::PriceNotFound(format!("unreadable price text {price_text:?}")))?;

    let name = NAME_ELEMENT.text(html)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| url.to_string());

    Ok(PriceObservation { price, name })
}
