//! Selector Matching
//!
//! Compound selectors and selector lists: type, `#id`, `.class`, `*`
//! and attribute conditions (`[a]`, `[a="v"]`, `[a*="v"]`, `[a^="v"]`,
//! `[a$="v"]`, `[a~="v"]`). Combinators are not supported.

use crate::node::ElementData;
use crate::DomError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Includes(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Component {
    Universal,
    Tag(String),
    Id(String),
    Class(String),
    Attr { name: String, op: AttrOp },
}

impl Component {
    fn matches(&self, el: &ElementData) -> bool {
        match self {
            Component::Universal => true,
            Component::Tag(tag) => el.tag == *tag,
            Component::Id(id) => el.id() == Some(id.as_str()),
            Component::Class(class) => el.has_class(class),
            Component::Attr { name, op } => {
                let Some(value) = el.attr(name) else {
                    return false;
                };
                match op {
                    AttrOp::Exists => true,
                    AttrOp::Equals(v) => value == v,
                    AttrOp::Includes(v) => value.split_whitespace().any(|w| w == v),
                    AttrOp::Contains(v) => !v.is_empty() && value.contains(v.as_str()),
                    AttrOp::StartsWith(v) => !v.is_empty() && value.starts_with(v.as_str()),
                    AttrOp::EndsWith(v) => !v.is_empty() && value.ends_with(v.as_str()),
                }
            }
        }
    }
}

/// Compound selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    components: Vec<Component>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let invalid = || DomError::InvalidSelector(input.to_string());
        let mut chars = input.trim().chars().peekable();
        let mut components = Vec::new();

        while let Some(&c) = chars.peek() {
            match c {
                '*' => {
                    chars.next();
                    components.push(Component::Universal);
                }
                '#' | '.' => {
                    chars.next();
                    let ident = read_ident(&mut chars);
                    if ident.is_empty() {
                        return Err(invalid());
                    }
                    components.push(if c == '#' {
                        Component::Id(ident)
                    } else {
                        Component::Class(ident)
                    });
                }
                '[' => {
                    chars.next();
                    let body: String = chars.by_ref().take_while(|&c| c != ']').collect();
                    components.push(parse_attr(&body).ok_or_else(invalid)?);
                }
                c if is_ident_char(c) => {
                    if !components.is_empty() {
                        return Err(invalid());
                    }
                    components.push(Component::Tag(read_ident(&mut chars).to_ascii_lowercase()));
                }
                _ => return Err(invalid()),
            }
        }

        if components.is_empty() {
            return Err(invalid());
        }
        Ok(Self { components })
    }

    pub fn matches(&self, el: &ElementData) -> bool {
        self.components.iter().all(|c| c.matches(el))
    }
}

/// Comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Selector>,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let selectors = split_list(input)
            .into_iter()
            .map(Selector::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { selectors })
    }

    pub fn matches(&self, el: &ElementData) -> bool {
        self.selectors.iter().any(|s| s.matches(el))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

fn parse_attr(body: &str) -> Option<Component> {
    let body = body.trim();
    let Some(eq) = body.find('=') else {
        if body.is_empty() || !body.chars().all(is_ident_char) {
            return None;
        }
        return Some(Component::Attr {
            name: body.to_ascii_lowercase(),
            op: AttrOp::Exists,
        });
    };

    let (lhs, rhs) = body.split_at(eq);
    let rhs = rhs[1..].trim();
    let value = rhs
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| rhs.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(rhs)
        .to_string();

    let (name, op) = match lhs.trim_end().chars().last()? {
        '*' => (&lhs[..lhs.len() - 1], AttrOp::Contains(value)),
        '^' => (&lhs[..lhs.len() - 1], AttrOp::StartsWith(value)),
        '$' => (&lhs[..lhs.len() - 1], AttrOp::EndsWith(value)),
        '~' => (&lhs[..lhs.len() - 1], AttrOp::Includes(value)),
        _ => (lhs, AttrOp::Equals(value)),
    };
    let name = name.trim();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return None;
    }
    Some(Component::Attr { name: name.to_ascii_lowercase(), op })
}

/// Split on top-level commas (commas inside `[...]` stay)
fn split_list(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, attrs: &[(&str, &str)]) -> ElementData {
        let mut el = ElementData::new(tag);
        for (name, value) in attrs {
            el.set_attr(name, value);
        }
        el
    }

    #[test]
    fn test_simple_selector_parse() {
        assert!(Selector::parse("div").is_ok());
        assert!(Selector::parse(".class").is_ok());
        assert!(Selector::parse("#id").is_ok());
        assert!(Selector::parse("*").is_ok());
        assert!(Selector::parse("div > span").is_err());
        assert!(Selector::parse("").is_err());
    }

    #[test]
    fn test_element_matches() {
        let el = element("div", &[("id", "main"), ("class", "container active")]);
        assert!(Selector::parse("div").unwrap().matches(&el));
        assert!(Selector::parse("#main").unwrap().matches(&el));
        assert!(Selector::parse("div.container.active").unwrap().matches(&el));
        assert!(!Selector::parse("span.container").unwrap().matches(&el));
    }

    #[test]
    fn test_attribute_conditions() {
        let el = element(
            "div",
            &[("data-testid", "video-player"), ("class", "PlayerContainer big")],
        );
        let matches = |s: &str| SelectorList::parse(s).unwrap().matches(&el);
        assert!(matches("[data-testid]"));
        assert!(matches("[data-testid=\"video-player\"]"));
        assert!(matches("[data-testid*=\"player\"]"));
        assert!(matches("[data-testid^='video']"));
        assert!(matches("[data-testid$=player]"));
        assert!(matches("[class~=\"big\"]"));
        assert!(matches("[class*=\"Player\"]"));
        assert!(!matches("[data-testid=\"player\"]"));
        assert!(!matches("[data-uia]"));
    }

    #[test]
    fn test_selector_list() {
        let el = element("ytd-shorts", &[]);
        let list = SelectorList::parse(".ytp-ad-module, ytd-shorts, [data-x=\"a,b\"]").unwrap();
        assert!(list.matches(&el));
        assert_eq!(split_list("[data-x=\"a,b\"], p").len(), 2);
    }
}
