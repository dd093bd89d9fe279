use crate::domain::model::{BlocklistSource, SourceError, SourceFetch, SyncPlan};
use std::collections::{BTreeSet, HashSet};
use std::net::IpAddr;

const MAX_DOMAIN_LENGTH: usize = 253;

/// hosts 檔常見的本機項目，不應送進 denylist
const LOCAL_HOST_NAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "local",
    "broadcasthost",
    "0.0.0.0",
];

/// Parses the sources file: one URL per line, `#` comments and blank lines
/// ignored, duplicates dropped in first-seen order.
pub fn parse_source_list(text: &str) -> Vec<BlocklistSource> {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(line.to_string()))
        .map(|line| BlocklistSource {
            url: line.to_string(),
        })
        .collect()
}

/// Extracts a domain from one blocklist line.
///
/// Handles plain domain lists, hosts files (`0.0.0.0 example.com`) and the
/// `||example.com^` subset of adblock syntax. Returns the lowercased domain
/// or `None` for comments, local names and anything that is not a domain.
pub fn parse_blocklist_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
        return None;
    }

    // 去掉行內註解
    let line = match line.find('#') {
        Some(idx) => line[..idx].trim_end(),
        None => line,
    };

    if let Some(rule) = line.strip_prefix("||") {
        let domain = rule.strip_suffix('^')?;
        return normalize_domain(domain);
    }
    if line.starts_with("@@") {
        return None;
    }

    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    let candidate = if first.parse::<IpAddr>().is_ok() {
        tokens.next()?
    } else {
        first
    };

    normalize_domain(candidate)
}

pub fn normalize_domain(raw: &str) -> Option<String> {
    let domain = raw.trim().to_ascii_lowercase();
    let domain = domain.strip_suffix('.').unwrap_or(&domain);

    if domain.is_empty()
        || domain.len() > MAX_DOMAIN_LENGTH
        || !domain.contains('.')
        || LOCAL_HOST_NAMES.contains(&domain)
        || domain.starts_with("ip6-")
    {
        return None;
    }

    let valid_chars = domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'));
    if !valid_chars || domain.split('.').any(str::is_empty) {
        return None;
    }

    // 純 IP 位址不是網域
    if domain.parse::<IpAddr>().is_ok() {
        return None;
    }

    Some(domain.to_string())
}

pub fn parse_blocklist(text: &str) -> BTreeSet<String> {
    text.lines().filter_map(parse_blocklist_line).collect()
}

pub fn merge_sources(sources: &[SourceFetch]) -> BTreeSet<String> {
    sources
        .iter()
        .flat_map(|source| source.domains.iter().cloned())
        .collect()
}

fn is_allowlisted(domain: &str, allowlist: &HashSet<String>) -> bool {
    if allowlist.contains(domain) {
        return true;
    }
    // 逐層檢查父網域
    domain
        .match_indices('.')
        .any(|(idx, _)| allowlist.contains(&domain[idx + 1..]))
}

/// Drops every domain equal to, or a subdomain of, an allowlist entry.
pub fn apply_allowlist(domains: BTreeSet<String>, allowlist: &[String]) -> BTreeSet<String> {
    if allowlist.is_empty() {
        return domains;
    }

    let allowlist: HashSet<String> = allowlist
        .iter()
        .filter_map(|entry| normalize_domain(entry))
        .collect();

    domains
        .into_iter()
        .filter(|domain| !is_allowlisted(domain, &allowlist))
        .collect()
}

pub fn source_errors(sources: &[SourceFetch]) -> Vec<SourceError> {
    sources
        .iter()
        .filter_map(|source| {
            source.error.as_ref().map(|message| SourceError {
                url: source.url.clone(),
                message: message.clone(),
            })
        })
        .collect()
}

pub fn plan_sync(
    desired: &BTreeSet<String>,
    current: &BTreeSet<String>,
    remove_stale: bool,
) -> SyncPlan {
    let to_add: BTreeSet<String> = desired.difference(current).cloned().collect();
    let stale: BTreeSet<String> = current.difference(desired).cloned().collect();

    let (to_remove, removals_suppressed) = if remove_stale {
        (stale, false)
    } else {
        let suppressed = !stale.is_empty();
        (BTreeSet::new(), suppressed)
    };

    SyncPlan {
        desired_count: desired.len(),
        current_count: current.len(),
        to_add,
        to_remove,
        removals_suppressed,
        ..SyncPlan::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_source_list_skips_comments_and_duplicates() {
        let text = "
        # upstream lists
        https://example.com/a.txt

        https://example.com/b.txt
        https://example.com/a.txt
        ";

        let sources = parse_source_list(text);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].url, "https://example.com/a.txt");
        assert_eq!(sources[1].url, "https://example.com/b.txt");
    }

    #[test]
    fn test_parse_plain_and_hosts_lines() {
        assert_eq!(
            parse_blocklist_line("ads.example.com"),
            Some("ads.example.com".to_string())
        );
        assert_eq!(
            parse_blocklist_line("  Tracker.Example.NET.  "),
            Some("tracker.example.net".to_string())
        );
        assert_eq!(
            parse_blocklist_line("0.0.0.0 ads.example.com"),
            Some("ads.example.com".to_string())
        );
        assert_eq!(
            parse_blocklist_line("127.0.0.1\tmetrics.example.org # telemetry"),
            Some("metrics.example.org".to_string())
        );
        assert_eq!(
            parse_blocklist_line("ads.example.com some trailing junk"),
            Some("ads.example.com".to_string())
        );
    }

    #[test]
    fn test_parse_skips_comments_and_local_entries() {
        assert_eq!(parse_blocklist_line(""), None);
        assert_eq!(parse_blocklist_line("# comment"), None);
        assert_eq!(parse_blocklist_line("! adblock comment"), None);
        assert_eq!(parse_blocklist_line("127.0.0.1 localhost"), None);
        assert_eq!(parse_blocklist_line("::1 ip6-localhost"), None);
        assert_eq!(parse_blocklist_line("0.0.0.0 0.0.0.0"), None);
        assert_eq!(parse_blocklist_line("255.255.255.255 broadcasthost"), None);
        assert_eq!(parse_blocklist_line("0.0.0.0"), None);
    }

    #[test]
    fn test_parse_adblock_rules() {
        assert_eq!(
            parse_blocklist_line("||ads.example.com^"),
            Some("ads.example.com".to_string())
        );
        assert_eq!(parse_blocklist_line("@@||good.example.com^"), None);
        assert_eq!(parse_blocklist_line("||example.com/path^"), None);
        assert_eq!(parse_blocklist_line("||example.com^$third-party"), None);
        assert_eq!(parse_blocklist_line("||*.example.com^"), None);
    }

    #[test]
    fn test_normalize_rejects_invalid_domains() {
        assert_eq!(normalize_domain("nodot"), None);
        assert_eq!(normalize_domain("bad..example.com"), None);
        assert_eq!(normalize_domain("exa mple.com"), None);
        assert_eq!(normalize_domain("10.0.0.1"), None);
        assert_eq!(normalize_domain(&format!("{}.com", "a".repeat(260))), None);
        assert_eq!(
            normalize_domain("_dmarc.example.com"),
            Some("_dmarc.example.com".to_string())
        );
    }

    #[test]
    fn test_parse_blocklist_deduplicates() {
        let content = "
        # hosts style
        0.0.0.0 ads.example.com
        0.0.0.0 ADS.example.com
        tracker.example.net
        ||tracker.example.net^
        ";

        let domains = parse_blocklist(content);
        assert_eq!(domains, set(&["ads.example.com", "tracker.example.net"]));
    }

    #[test]
    fn test_merge_sources_ignores_failed() {
        let sources = vec![
            SourceFetch::ok("a", set(&["a.com", "shared.com"])),
            SourceFetch::ok("b", set(&["b.com", "shared.com"])),
            SourceFetch::failed("c", "timeout"),
        ];

        let merged = merge_sources(&sources);
        assert_eq!(merged, set(&["a.com", "b.com", "shared.com"]));

        let errors = source_errors(&sources);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].url, "c");
    }

    #[test]
    fn test_apply_allowlist_covers_subdomains() {
        let domains = set(&[
            "ads.example.com",
            "example.com",
            "notexample.com",
            "cdn.good.org",
        ]);
        let allowlist = vec!["Example.com".to_string(), "cdn.good.org".to_string()];

        let filtered = apply_allowlist(domains, &allowlist);
        assert_eq!(filtered, set(&["notexample.com"]));
    }

    #[test]
    fn test_plan_sync_diff() {
        let desired = set(&["a.com", "b.com", "c.com"]);
        let current = set(&["b.com", "old.com"]);

        let plan = plan_sync(&desired, &current, true);
        assert_eq!(plan.to_add, set(&["a.com", "c.com"]));
        assert_eq!(plan.to_remove, set(&["old.com"]));
        assert_eq!(plan.desired_count, 3);
        assert_eq!(plan.current_count, 2);
        assert!(!plan.removals_suppressed);
    }

    #[test]
    fn test_plan_sync_without_removals() {
        let desired = set(&["a.com"]);
        let current = set(&["old.com"]);

        let plan = plan_sync(&desired, &current, false);
        assert_eq!(plan.to_add, set(&["a.com"]));
        assert!(plan.to_remove.is_empty());
        assert!(plan.removals_suppressed);
    }

    #[test]
    fn test_plan_sync_is_idempotent() {
        let desired = set(&["a.com", "b.com"]);
        let plan = plan_sync(&desired, &desired, true);
        assert!(plan.is_empty());
    }
}
