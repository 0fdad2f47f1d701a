//! Overlay markup
//!
//! The overlay is a custom-tag wrapper hosting an open shadow root. All
//! overlays adopt one shared stylesheet; per-overlay tuning goes through
//! custom properties on the wrapper and panel.

use std::sync::{Arc, OnceLock};

use fos_dom::{DomError, DomTree, NodeId, ShadowRootMode, StyleSheet};

use crate::constants::controller;

const OVERLAY_CSS: &str = r#":host {
  position: absolute;
  top: 0;
  left: 0;
  z-index: var(--ratectl-z-index);
  pointer-events: none;
}
.ratectl-panel {
  display: inline-flex;
  align-items: center;
  gap: 4px;
  padding: 4px;
  border-radius: 6px;
  background: rgba(0, 0, 0, 0.7);
  color: #fff;
  font: 600 var(--ratectl-font-size) system-ui, sans-serif;
  opacity: var(--ratectl-opacity);
  pointer-events: auto;
  transition: opacity 0.2s;
}
.ratectl-panel:hover { opacity: 1; }
.ratectl-panel.hidden { display: none; }
.ratectl-panel.dragging { cursor: grabbing; }
.ratectl-speed { cursor: grab; min-width: 3.5em; text-align: center; }
.ratectl-controls { display: none; gap: 2px; }
.ratectl-panel:hover .ratectl-controls { display: inline-flex; }
.ratectl-btn {
  border: 0;
  border-radius: 4px;
  padding: 2px 6px;
  background: transparent;
  color: inherit;
  cursor: pointer;
}
.ratectl-btn:hover { background: rgba(255, 255, 255, 0.2); }
.ratectl-osd {
  margin-top: 4px;
  padding: 2px 6px;
  border-radius: 4px;
  background: rgba(0, 0, 0, 0.7);
  color: #fff;
  opacity: 0;
  transition: opacity 0.3s;
}
.ratectl-osd.show { opacity: 1; }
"#;

/// Stylesheet adopted by every overlay, built on first use
pub fn shared_style_sheet() -> Arc<StyleSheet> {
    static SHEET: OnceLock<Arc<StyleSheet>> = OnceLock::new();
    SHEET.get_or_init(|| Arc::new(StyleSheet::new(OVERLAY_CSS))).clone()
}

/// Overlay button actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Rewind,
    Slower,
    Faster,
    Advance,
    Hide,
}

impl ButtonAction {
    pub const ALL: [ButtonAction; 5] = [
        ButtonAction::Rewind,
        ButtonAction::Slower,
        ButtonAction::Faster,
        ButtonAction::Advance,
        ButtonAction::Hide,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ButtonAction::Rewind => "rewind",
            ButtonAction::Slower => "slower",
            ButtonAction::Faster => "faster",
            ButtonAction::Advance => "advance",
            ButtonAction::Hide => "hide",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ButtonAction::Rewind => "Rewind",
            ButtonAction::Slower => "Slower",
            ButtonAction::Faster => "Faster",
            ButtonAction::Advance => "Advance",
            ButtonAction::Hide => "Hide controller",
        }
    }

    fn glyph(self) -> &'static str {
        match self {
            ButtonAction::Rewind => "«",
            ButtonAction::Slower => "−",
            ButtonAction::Faster => "+",
            ButtonAction::Advance => "»",
            ButtonAction::Hide => "×",
        }
    }
}

/// Node handles of one overlay instance
#[derive(Debug, Clone)]
pub struct Overlay {
    pub wrapper: NodeId,
    pub shadow: NodeId,
    pub panel: NodeId,
    pub speed_display: NodeId,
    pub osd: NodeId,
    pub buttons: Vec<(ButtonAction, NodeId)>,
}

impl Overlay {
    /// Build a detached overlay
    pub fn build(dom: &mut DomTree, id: &str, hidden: bool, opacity: f64, button_size: f64) -> Result<Overlay, DomError> {
        let wrapper = dom.create_element(controller::TAG);
        dom.set_attr(wrapper, "id", id)?;
        dom.set_style(wrapper, "--ratectl-z-index", &controller::Z_INDEX.to_string())?;
        let shadow = dom.attach_shadow(wrapper, ShadowRootMode::Open)?;
        dom.adopt_style_sheet(shadow, shared_style_sheet())?;

        let panel = dom.create_element("div");
        dom.add_class(panel, "ratectl-panel")?;
        if hidden {
            dom.add_class(panel, "hidden")?;
        }

        let speed_display = dom.create_element("span");
        dom.add_class(speed_display, "ratectl-speed")?;
        dom.set_attr(speed_display, "role", "status")?;
        dom.set_attr(speed_display, "aria-live", "polite")?;
        dom.set_attr(speed_display, "aria-label", "Current playback speed")?;
        dom.set_attr(speed_display, "tabindex", "0")?;
        let text = dom.create_text("");
        dom.append_child(speed_display, text)?;

        let controls = dom.create_element("span");
        dom.add_class(controls, "ratectl-controls")?;
        let mut buttons = Vec::with_capacity(ButtonAction::ALL.len());
        for action in ButtonAction::ALL {
            let button = dom.create_element("button");
            dom.add_class(button, "ratectl-btn")?;
            dom.set_attr(button, "data-action", action.as_str())?;
            dom.set_attr(button, "aria-label", action.label())?;
            let glyph = dom.create_text(action.glyph());
            dom.append_child(button, glyph)?;
            if action == ButtonAction::Hide {
                dom.add_class(button, "ratectl-btn-hide")?;
                dom.set_attr(button, "aria-pressed", if hidden { "true" } else { "false" })?;
            }
            dom.append_child(controls, button)?;
            buttons.push((action, button));
        }

        dom.append_child(panel, speed_display)?;
        dom.append_child(panel, controls)?;

        let osd = dom.create_element("div");
        dom.add_class(osd, "ratectl-osd")?;
        let osd_text = dom.create_text("");
        dom.append_child(osd, osd_text)?;

        dom.append_child(shadow, panel)?;
        dom.append_child(shadow, osd)?;

        let overlay = Overlay { wrapper, shadow, panel, speed_display, osd, buttons };
        overlay.apply_appearance(dom, opacity, button_size)?;
        Ok(overlay)
    }

    pub fn button(&self, action: ButtonAction) -> Option<NodeId> {
        self.buttons.iter().find(|(a, _)| *a == action).map(|(_, id)| *id)
    }

    /// Opacity and size custom properties plus the collapsed box size
    pub fn apply_appearance(&self, dom: &mut DomTree, opacity: f64, button_size: f64) -> Result<(), DomError> {
        dom.set_style(self.panel, "--ratectl-opacity", &opacity.to_string())?;
        dom.set_style(self.panel, "--ratectl-font-size", &format!("{}px", button_size))?;
        let (width, height) = collapsed_size(button_size);
        dom.set_intrinsic_size(self.wrapper, width, height)
    }

    pub fn set_speed_text(&self, dom: &mut DomTree, rate: f64) -> Result<(), DomError> {
        dom.set_text_content(self.speed_display, &format_speed(rate))
    }

    pub fn set_position(&self, dom: &mut DomTree, x: f64, y: f64) -> Result<(), DomError> {
        dom.set_style(self.wrapper, "transform", &format!("translate({}px, {}px)", x, y))
    }

    pub fn set_hidden(&self, dom: &mut DomTree, hidden: bool) -> Result<(), DomError> {
        dom.toggle_class(self.panel, "hidden", Some(hidden))?;
        if let Some(button) = self.button(ButtonAction::Hide) {
            dom.set_attr(button, "aria-pressed", if hidden { "true" } else { "false" })?;
        }
        Ok(())
    }
}

/// Size of the panel with its controls collapsed: the speed readout only
pub fn collapsed_size(button_size: f64) -> (f64, f64) {
    (button_size * 3.5 + 8.0, button_size + 10.0)
}

pub fn format_speed(rate: f64) -> String {
    format!("{:.2}x", rate)
}
