//! robots.txt handling for the `*` user-agent group.

use parking_lot::RwLock;
use reqwest::{header, Client};
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Robots {
    pub allows: Vec<String>,
    pub disallows: Vec<String>,
    pub crawl_delay_ms: Option<u64>,
}

impl Robots {
    pub fn parse(txt: &str) -> Self {
        let mut active = false;
        let mut rules = Robots::default();
        for line in txt.lines() {
            let l = line.split('#').next().unwrap_or("").trim();
            if l.is_empty() {
                continue;
            }
            let Some((k, v)) = l.split_once(':') else { continue };
            let val = v.trim();
            match k.trim().to_lowercase().as_str() {
                "user-agent" => active = val == "*",
                "allow" if active && !val.is_empty() => rules.allows.push(val.to_string()),
                "disallow" if active && !val.is_empty() => rules.disallows.push(val.to_string()),
                "crawl-delay" if active => {
                    if let Ok(n) = val.parse::<f64>() {
                        rules.crawl_delay_ms = Some((n * 1000.0) as u64);
                    }
                }
                _ => {}
            }
        }
        rules
    }

    /// Longest matching rule wins; on equal length Allow wins.
    pub fn allows_path(&self, path: &str) -> bool {
        let longest = |rules: &[String]| rules.iter().filter(|r| path.starts_with(r.as_str())).map(String::len).max();
        match (longest(&self.allows), longest(&self.disallows)) {
            (Some(a), Some(d)) => a >= d,
            (_, None) => true,
            (None, Some(_)) => false,
        }
    }
}

/// Per-host robots rules, fetched once and shared by all workers.
#[derive(Default)]
pub struct RobotsCache {
    hosts: RwLock<HashMap<String, Robots>>,
}

impl RobotsCache {
    pub async fn rules_for(&self, client: &Client, url: &Url) -> Option<Robots> {
        let host = url.host_str()?.to_string();
        let cached = self.hosts.read().get(&host).cloned();
        if cached.is_some() {
            return cached;
        }
        let robots_url = format!("{}://{}/robots.txt", url.scheme(), host);
        let txt = match client.get(&robots_url).header(header::ACCEPT, "text/plain").send().await {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            _ => String::new(),
        };
        let parsed = Robots::parse(&txt);
        self.hosts.write().insert(host, parsed.clone());
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TXT: &str = "\
User-agent: googlebot
Disallow: /

User-agent: *
Disallow: /private
Allow: /private/public
Crawl-delay: 1.5 # seconds
";

    #[test]
    fn parses_only_the_wildcard_group() {
        let r = Robots::parse(TXT);
        assert_eq!(r.disallows, vec!["/private"]);
        assert_eq!(r.allows, vec!["/private/public"]);
        assert_eq!(r.crawl_delay_ms, Some(1500));
    }

    #[test]
    fn longest_match_decides() {
        let r = Robots::parse(TXT);
        assert!(r.allows_path("/docs"));
        assert!(!r.allows_path("/private/keys"));
        assert!(r.allows_path("/private/public/page"));
    }

    #[test]
    fn empty_disallow_allows_everything() {
        let r = Robots::parse("User-agent: *\nDisallow:\n");
        assert!(r.allows_path("/anything"));
    }
}
