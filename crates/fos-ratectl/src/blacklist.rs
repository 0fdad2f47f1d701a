//! Site blacklist
//!
//! One entry per line. `/pattern/` lines are case-insensitive regular
//! expressions tested against the raw hostname; any other line is a domain
//! matching itself and its subdomains. Compiled patterns are cached by
//! list text.

use std::cell::RefCell;
use std::rc::Rc;

use regex::{Regex, RegexBuilder};

#[derive(Debug)]
enum Pattern {
    Regex(Regex),
    Domain(String),
}

thread_local! {
    static COMPILED: RefCell<Option<(String, Rc<Vec<Pattern>>)>> = const { RefCell::new(None) };
}

fn compile(list: &str) -> Vec<Pattern> {
    let mut patterns = Vec::new();
    for line in list.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.len() >= 2 && line.starts_with('/') && line.ends_with('/') {
            match RegexBuilder::new(&line[1..line.len() - 1]).case_insensitive(true).build() {
                Ok(re) => patterns.push(Pattern::Regex(re)),
                Err(e) => tracing::warn!("Invalid regex pattern in blacklist {}: {}", line, e),
            }
        } else {
            patterns.push(Pattern::Domain(line.to_lowercase()));
        }
    }
    patterns
}

fn patterns_for(list: &str) -> Rc<Vec<Pattern>> {
    COMPILED.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some((source, patterns)) = cache.as_ref() {
            if source == list {
                return patterns.clone();
            }
        }
        let patterns = Rc::new(compile(list));
        *cache = Some((list.to_string(), patterns.clone()));
        patterns
    })
}

/// Whether `hostname` is excluded by the newline-delimited `list`
pub fn is_blacklisted(list: &str, hostname: &str) -> bool {
    let patterns = patterns_for(list);
    if patterns.is_empty() {
        return false;
    }
    let host = hostname.to_lowercase();
    patterns.iter().any(|pattern| match pattern {
        Pattern::Regex(re) => re.is_match(hostname),
        Pattern::Domain(domain) => {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_domains() {
        let list = "example.com\n  \nvideo.org";
        assert!(is_blacklisted(list, "example.com"));
        assert!(is_blacklisted(list, "www.example.com"));
        assert!(is_blacklisted(list, "A.B.Video.org"));
        assert!(!is_blacklisted(list, "notexample.com"));
        assert!(!is_blacklisted(list, "example.com.evil.net"));
    }

    #[test]
    fn test_literal_property() {
        let domains = ["x.com", "meet.google.com", "a.b"];
        let hosts = ["x.com", "ax.com", "www.x.com", "google.com", "meet.google.com", "b", "a.b", "c.a.b"];
        for domain in domains {
            for host in hosts {
                let expected = host == domain || host.ends_with(&format!(".{domain}"));
                assert_eq!(is_blacklisted(domain, host), expected, "{domain} vs {host}");
            }
        }
    }

    #[test]
    fn test_regex_lines() {
        let list = "/^(www\\.)?netflix\\.com$/\n/TUBE/";
        assert!(is_blacklisted(list, "netflix.com"));
        assert!(is_blacklisted(list, "WWW.NETFLIX.COM"));
        assert!(!is_blacklisted(list, "m.netflix.com"));
        assert!(is_blacklisted(list, "www.youtube.com"));
    }

    #[test]
    fn test_invalid_regex_skipped() {
        let list = "/([/\nvimeo.com";
        assert!(!is_blacklisted(list, "example.com"));
        assert!(is_blacklisted(list, "vimeo.com"));
    }

    #[test]
    fn test_cache_follows_list_text() {
        assert!(is_blacklisted("a.com", "a.com"));
        assert!(!is_blacklisted("b.com", "a.com"));
        assert!(is_blacklisted("a.com", "a.com"));
        assert!(!is_blacklisted("", "a.com"));
    }
}
