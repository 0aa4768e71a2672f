//! Robots.txt parser implementation
//!
//! Allow/disallow decisions are delegated to the robotstxt crate's matcher.
//! The group structure is also parsed here to expose the disallow prefixes,
//! declared sitemaps and Crawl-delay that apply to the audit agent.

use robotstxt::DefaultMatcher;
use url::Url;

/// One `User-agent` group of a robots.txt file
#[derive(Debug, Clone, Default)]
struct Group {
    agents: Vec<String>,
    disallow: Vec<String>,
    crawl_delay: Option<f64>,
}

/// Parsed robots.txt rules for one agent
#[derive(Debug, Clone)]
pub struct RobotsRules {
    /// Raw robots.txt content (empty means allow all)
    content: String,

    /// Product token the rules are evaluated for
    agent: String,

    /// Disallow path prefixes of the group that applies to `agent`, in file order
    disallow: Vec<String>,

    /// Sitemap URLs declared anywhere in the file, in file order
    sitemaps: Vec<String>,

    /// Crawl-delay (seconds) of the applicable group
    crawl_delay: Option<f64>,

    /// Whether the rules came from a fetched robots.txt
    fetched: bool,
}

impl RobotsRules {
    /// Parses robots.txt content for the given agent token
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    /// * `agent` - The product token matched against `User-agent` lines
    pub fn parse(content: &str, agent: &str) -> Self {
        let (groups, sitemaps) = parse_groups(content);
        let agent_lower = agent.to_lowercase();

        // A group naming the agent replaces the wildcard group entirely
        let specific: Vec<&Group> = groups
            .iter()
            .filter(|g| g.agents.iter().any(|a| a != "*" && agent_lower.contains(a.as_str())))
            .collect();
        let applicable: Vec<&Group> = if specific.is_empty() {
            groups
                .iter()
                .filter(|g| g.agents.iter().any(|a| a == "*"))
                .collect()
        } else {
            specific
        };

        let mut disallow = Vec::new();
        let mut crawl_delay = None;
        for group in applicable {
            for prefix in &group.disallow {
                if !disallow.contains(prefix) {
                    disallow.push(prefix.clone());
                }
            }
            crawl_delay = crawl_delay.or(group.crawl_delay);
        }

        Self {
            content: content.to_string(),
            agent: agent.to_string(),
            disallow,
            sitemaps,
            crawl_delay,
            fetched: true,
        }
    }

    /// Rules used when robots.txt could not be fetched: allow everything,
    /// declare nothing
    pub fn unavailable(agent: &str) -> Self {
        Self {
            content: String::new(),
            agent: agent.to_string(),
            disallow: Vec::new(),
            sitemaps: Vec::new(),
            crawl_delay: None,
            fetched: false,
        }
    }

    /// Whether these rules came from a successfully fetched robots.txt
    pub fn is_fetched(&self) -> bool {
        self.fetched
    }

    /// Disallow path prefixes applying to the agent, in file order
    pub fn disallow_prefixes(&self) -> &[String] {
        &self.disallow
    }

    /// Declared sitemap URLs, in file order
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    /// Crawl-delay in seconds for the agent, if declared
    pub fn crawl_delay(&self) -> Option<f64> {
        self.crawl_delay
    }

    /// Checks if a URL may be fetched by the agent
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn is_allowed(&self, url: &Url) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, &self.agent, url.as_str())
    }
}

/// Splits robots.txt content into agent groups and global sitemap lines
fn parse_groups(content: &str) -> (Vec<Group>, Vec<String>) {
    let mut groups: Vec<Group> = Vec::new();
    let mut sitemaps: Vec<String> = Vec::new();
    let mut current: Option<Group> = None;
    let mut last_was_agent = false;

    for line in content.lines() {
        // Strip comments
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                // Consecutive User-agent lines share one group
                if !last_was_agent {
                    if let Some(group) = current.take() {
                        groups.push(group);
                    }
                    current = Some(Group::default());
                }
                if let Some(group) = current.as_mut() {
                    group.agents.push(value.to_lowercase());
                }
                last_was_agent = true;
                continue;
            }
            "disallow" => {
                // An empty Disallow allows everything
                if let (Some(group), false) = (current.as_mut(), value.is_empty()) {
                    group.disallow.push(value.to_string());
                }
            }
            "crawl-delay" => {
                if let (Some(group), Ok(delay)) = (current.as_mut(), value.parse::<f64>()) {
                    group.crawl_delay = Some(delay);
                }
            }
            "sitemap" => {
                if !value.is_empty() && !sitemaps.iter().any(|s| s == value) {
                    sitemaps.push(value.to_string());
                }
            }
            _ => {
                // Allow and unknown directives don't affect the exposed rules
            }
        }
        last_was_agent = false;
    }

    if let Some(group) = current {
        groups.push(group);
    }

    (groups, sitemaps)
}
