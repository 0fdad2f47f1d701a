//! Inline Styles
//!
//! Declarations set through `element.style` and the handful of computed
//! properties the layout model needs.

/// CSS `position`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

impl Position {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "relative" => Position::Relative,
            "absolute" => Position::Absolute,
            "fixed" => Position::Fixed,
            "sticky" => Position::Sticky,
            _ => Position::Static,
        }
    }

    /// Whether an element with this position is a containing block
    pub fn is_positioned(self) -> bool {
        self != Position::Static
    }
}

/// Inline style declarations, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, property: &str, value: &str) {
        match self.declarations.iter_mut().find(|(name, _)| name == property) {
            Some(entry) => entry.1 = value.to_string(),
            None => self
                .declarations
                .push((property.to_string(), value.to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Serialize as a `style` attribute value
    pub fn to_css_text(&self) -> String {
        self.declarations
            .iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Computed values used by layout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedStyle {
    pub position: Position,
    /// `None` when the transform is `none`
    pub transform: Option<String>,
    pub display_none: bool,
}

impl ComputedStyle {
    pub fn from_inline(style: &InlineStyle) -> Self {
        let transform = style
            .get("transform")
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != "none")
            .map(str::to_string);
        Self {
            position: style.get("position").map(Position::parse).unwrap_or_default(),
            transform,
            display_none: style.get("display").is_some_and(|d| d.trim() == "none"),
        }
    }

    /// Offset from a `translate(x, y)` transform, zero otherwise
    pub fn translation(&self) -> (f64, f64) {
        self.transform
            .as_deref()
            .and_then(parse_translate)
            .unwrap_or((0.0, 0.0))
    }
}

/// Parse `translate(12px, 34px)`
pub fn parse_translate(value: &str) -> Option<(f64, f64)> {
    let inner = value.trim().strip_prefix("translate(")?.strip_suffix(')')?;
    let mut parts = inner.split(',').map(|p| p.trim().trim_end_matches("px").trim());
    let x = parts.next()?.parse().ok()?;
    let y = match parts.next() {
        Some(y) => y.parse().ok()?,
        None => 0.0,
    };
    Some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_style_set_replaces() {
        let mut style = InlineStyle::default();
        style.set("position", "relative");
        style.set("position", "absolute");
        assert_eq!(style.get("position"), Some("absolute"));
        assert_eq!(style.to_css_text(), "position: absolute;");
    }

    #[test]
    fn test_computed_style() {
        let mut style = InlineStyle::default();
        style.set("transform", "translate(10px, 20px)");
        style.set("display", "none");
        let computed = ComputedStyle::from_inline(&style);
        assert_eq!(computed.position, Position::Static);
        assert_eq!(computed.translation(), (10.0, 20.0));
        assert!(computed.display_none);

        style.set("transform", "none");
        assert_eq!(ComputedStyle::from_inline(&style).transform, None);
    }

    #[test]
    fn test_parse_translate() {
        assert_eq!(parse_translate("translate(-4.5px, 3px)"), Some((-4.5, 3.0)));
        assert_eq!(parse_translate("translate(7px)"), Some((7.0, 0.0)));
        assert_eq!(parse_translate("rotate(3deg)"), None);
    }
}
