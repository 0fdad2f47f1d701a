//! Keybind Dispatcher
//!
//! One capture-phase `keydown` listener on the window, so keys are seen
//! before any page listener can stop them. Typing into text fields and
//! chords with ctrl/alt/meta are left alone.

use std::cell::Cell;
use std::rc::Weak;

use fos_dom::{DomTree, NodeId};
use fos_page::{Event, EventTarget, EventType, ListenerId, ListenerOptions, Page};

use crate::Result;
use crate::controller::{Controller, format_speed};
use crate::settings::{KeyAction, KeyBinding};

const TEXT_ENTRY_TAGS: &[&str] = &["input", "textarea", "select"];
const TEXT_ENTRY_ROLES: &[&str] = &["textbox", "searchbox", "combobox"];

/// What the dispatcher acts on
pub trait ControllerSource {
    /// Controllers keyboard actions apply to
    fn active_controllers(&self) -> Vec<Controller>;

    /// Current bindings; `None` while the overlay is disabled
    fn key_bindings(&self) -> Option<Vec<KeyBinding>>;
}

/// Whether keys typed at `node` belong to a text field
pub fn is_text_entry(dom: &DomTree, node: NodeId) -> bool {
    if dom.tag_name(node).is_some_and(|tag| TEXT_ENTRY_TAGS.contains(&tag)) {
        return true;
    }
    if let Some(editable) = dom.closest(node, "[contenteditable]") {
        if dom.attr(editable, "contenteditable").is_none_or(|v| !v.eq_ignore_ascii_case("false")) {
            return true;
        }
    }
    dom.attr(node, "role").is_some_and(|role| TEXT_ENTRY_ROLES.contains(&role))
}

/// First binding for the physical key `code`
pub fn find_binding<'a>(bindings: &'a [KeyBinding], code: &str) -> Option<&'a KeyBinding> {
    bindings.iter().find(|binding| binding.key == code)
}

/// Run one bound action on `ctl`
pub fn execute_action(ctl: &Controller, binding: &KeyBinding) -> Result<()> {
    match binding.action {
        KeyAction::Slower => ctl.adjust_speed(-binding.value)?,
        KeyAction::Faster => ctl.adjust_speed(binding.value)?,
        KeyAction::Rewind => return ctl.seek(-binding.value),
        KeyAction::Advance => return ctl.seek(binding.value),
        KeyAction::Reset => ctl.reset_speed()?,
        KeyAction::Display => {
            ctl.toggle_visibility();
            return Ok(());
        }
    }
    ctl.show_osd(&format_speed(ctl.speed()));
    Ok(())
}

/// Installed window key listener
pub struct KeybindDispatcher {
    page: Page,
    listener: Cell<Option<ListenerId>>,
}

impl KeybindDispatcher {
    /// Listen for bound keys. Sub-frames get no dispatcher.
    pub fn install(page: &Page, source: Weak<dyn ControllerSource>) -> Option<KeybindDispatcher> {
        if !page.is_top_frame() {
            tracing::debug!("Not the top frame - keybinds not installed");
            return None;
        }
        let handler_page = page.clone();
        let listener = page.add_event_listener(
            EventTarget::Window,
            EventType::KeyDown,
            ListenerOptions::capture(),
            move |event| {
                if let Some(source) = source.upgrade() {
                    handle_key_down(&handler_page, source.as_ref(), event);
                }
            },
        );
        Some(KeybindDispatcher { page: page.clone(), listener: Cell::new(Some(listener)) })
    }

    pub fn is_installed(&self) -> bool {
        self.listener.get().is_some()
    }

    /// Remove the listener; idempotent
    pub fn destroy(&self) {
        if let Some(listener) = self.listener.take() {
            self.page.remove_event_listener(listener);
        }
    }
}

impl Drop for KeybindDispatcher {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn handle_key_down(page: &Page, source: &dyn ControllerSource, event: &mut Event) {
    let Some(key) = event.key.as_ref() else {
        return;
    };
    let modifiers = key.modifiers;
    if modifiers.ctrl || modifiers.alt || modifiers.meta {
        return;
    }
    if let Some(target) = event.target_node() {
        if is_text_entry(&page.dom(), target) {
            return;
        }
    }
    let Some(bindings) = source.key_bindings() else {
        return;
    };
    let Some(binding) = find_binding(&bindings, &key.code) else {
        return;
    };

    for ctl in source.active_controllers() {
        if !ctl.is_active() || !ctl.is_connected() {
            continue;
        }
        if let Err(e) = execute_action(&ctl, binding) {
            tracing::warn!("Key {} on controller {}: {}", binding.key, ctl.id(), e);
        }
    }

    if binding.force {
        event.prevent_default();
        event.stop_immediate_propagation();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerConfig;
    use crate::settings::default_key_bindings;
    use crate::sites::SitePolicy;
    use fos_page::{Modifiers, PageOptions};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Fixed {
        controllers: Vec<Controller>,
        bindings: RefCell<Option<Vec<KeyBinding>>>,
    }

    impl ControllerSource for Fixed {
        fn active_controllers(&self) -> Vec<Controller> {
            self.controllers.clone()
        }

        fn key_bindings(&self) -> Option<Vec<KeyBinding>> {
            self.bindings.borrow().clone()
        }
    }

    fn setup(bindings: Vec<KeyBinding>) -> (Page, Rc<Fixed>, KeybindDispatcher, Controller) {
        let page = Page::new("https://example.com/");
        let body = page.dom().body();
        let video = {
            let mut dom = page.dom_mut();
            let video = dom.create_element("video");
            dom.append_child(body, video).unwrap();
            video
        };
        let ctl = Controller::new(&page, video, SitePolicy::Generic, ControllerConfig::default()).unwrap();
        let source = Rc::new(Fixed { controllers: vec![ctl.clone()], bindings: RefCell::new(Some(bindings)) });
        let weak: Weak<dyn ControllerSource> = Rc::downgrade(&source) as Weak<dyn ControllerSource>;
        let dispatcher = KeybindDispatcher::install(&page, weak).unwrap();
        (page, source, dispatcher, ctl)
    }

    #[test]
    fn test_text_entry_detection() {
        let mut dom = DomTree::new();
        let body = dom.body();
        let input = dom.create_element("input");
        let editor = dom.create_element("div");
        dom.set_attr(editor, "contenteditable", "true").unwrap();
        let inner = dom.create_element("span");
        let off = dom.create_element("div");
        dom.set_attr(off, "contenteditable", "false").unwrap();
        let search = dom.create_element("div");
        dom.set_attr(search, "role", "searchbox").unwrap();
        for node in [input, editor, off, search] {
            dom.append_child(body, node).unwrap();
        }
        dom.append_child(editor, inner).unwrap();

        assert!(is_text_entry(&dom, input));
        assert!(is_text_entry(&dom, inner));
        assert!(!is_text_entry(&dom, off));
        assert!(is_text_entry(&dom, search));
        assert!(!is_text_entry(&dom, body));
    }

    #[test]
    fn test_first_binding_wins() {
        let bindings = vec![
            KeyBinding::new(KeyAction::Faster, "KeyD", 0.5),
            KeyBinding::new(KeyAction::Slower, "KeyD", 0.1),
        ];
        assert_eq!(find_binding(&bindings, "KeyD").unwrap().action, KeyAction::Faster);
        assert!(find_binding(&bindings, "KeyQ").is_none());
    }

    #[test]
    fn test_faster_then_reset() {
        let (page, _source, _dispatcher, ctl) = setup(default_key_bindings());
        let body = page.dom().body();
        page.dispatch_event(body, Event::key_down("KeyD"));
        page.flush();
        assert_eq!(ctl.speed(), 1.1);
        assert_eq!(ctl.speed_text(), "1.10x");
        assert_eq!(ctl.osd_text(), "1.10x");

        page.dispatch_event(body, Event::key_down("KeyR"));
        page.flush();
        assert_eq!(ctl.speed(), 1.0);
        assert!(!ctl.is_enforcing());
    }

    #[test]
    fn test_ignored_inputs() {
        let (page, _source, _dispatcher, ctl) = setup(default_key_bindings());
        let body = page.dom().body();
        let input = {
            let mut dom = page.dom_mut();
            let input = dom.create_element("input");
            dom.append_child(body, input).unwrap();
            input
        };
        page.dispatch_event(input, Event::key_down("KeyD"));
        let ctrl = Modifiers { ctrl: true, ..Modifiers::default() };
        page.dispatch_event(body, Event::key_down("KeyD").with_modifiers(ctrl));
        page.flush();
        assert_eq!(ctl.speed(), 1.0);

        let shift = Modifiers { shift: true, ..Modifiers::default() };
        page.dispatch_event(body, Event::key_down("KeyD").with_modifiers(shift));
        page.flush();
        assert_eq!(ctl.speed(), 1.1);
    }

    #[test]
    fn test_force_hides_key_from_page() {
        let mut bindings = default_key_bindings();
        bindings[1].force = true;
        let (page, _source, _dispatcher, _ctl) = setup(bindings);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let root = page.dom().root();
        page.add_event_listener(root, EventType::KeyDown, ListenerOptions::default(), move |event| {
            if let Some(key) = &event.key {
                log.borrow_mut().push(key.code.clone());
            }
        });
        let body = page.dom().body();

        let forced = page.dispatch_event(body, Event::key_down("KeyD"));
        assert!(forced.default_prevented());
        let passed = page.dispatch_event(body, Event::key_down("KeyS"));
        assert!(!passed.default_prevented());
        assert_eq!(*seen.borrow(), vec!["KeyS".to_string()]);
    }

    #[test]
    fn test_disabled_and_destroyed() {
        let (page, source, dispatcher, ctl) = setup(default_key_bindings());
        let body = page.dom().body();
        source.bindings.replace(None);
        page.dispatch_event(body, Event::key_down("KeyD"));
        assert_eq!(ctl.target_speed(), 1.0);

        source.bindings.replace(Some(default_key_bindings()));
        dispatcher.destroy();
        dispatcher.destroy();
        assert!(!dispatcher.is_installed());
        page.dispatch_event(body, Event::key_down("KeyD"));
        assert_eq!(ctl.target_speed(), 1.0);
    }

    #[test]
    fn test_display_toggles_overlay() {
        let (page, _source, _dispatcher, ctl) = setup(default_key_bindings());
        let body = page.dom().body();
        page.dispatch_event(body, Event::key_down("KeyV"));
        assert!(ctl.is_manually_hidden());
        page.dispatch_event(body, Event::key_down("KeyV"));
        assert!(!ctl.is_manually_hidden());
    }

    #[test]
    fn test_sub_frame_gets_no_dispatcher() {
        let page = Page::with_options(PageOptions { top_frame: false, ..PageOptions::new("https://example.com/") });
        let source: Rc<dyn ControllerSource> =
            Rc::new(Fixed { controllers: Vec::new(), bindings: RefCell::new(None) });
        assert!(KeybindDispatcher::install(&page, Rc::downgrade(&source)).is_none());
        assert_eq!(page.listener_count(), 0);
    }
}
