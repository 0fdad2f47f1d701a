//! fOS Rate Control - scenario runner
//!
//! Usage: `ratectl-sim [settings.json] [url]`
//!
//! Builds a small page with a light-DOM player and a player inside a
//! shadow root, attaches the overlay, replays keyboard and message input
//! and logs controller state along the way.

use std::rc::Rc;

use anyhow::{Context, Result};
use fos_dom::{DOMRect, NodeId, ShadowRootMode};
use fos_media::ReadyState;
use fos_page::{Event, Page};
use fos_ratectl::{ControlMessage, Coordinator, MemorySettings, Settings, logging};

fn load_settings(path: Option<&str>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    Settings::from_json_str(&json).with_context(|| format!("parsing {}", path))
}

fn build_page(page: &Page) -> Result<(NodeId, NodeId)> {
    let body = page.dom().body();
    let mut dom = page.dom_mut();

    let player = dom.create_element("div");
    dom.add_class(player, "player-container")?;
    dom.append_child(body, player)?;
    dom.set_layout_rect(player, DOMRect::from_xywh(0.0, 0.0, 960.0, 540.0))?;
    let main = dom.create_element("video");
    dom.append_child(player, main)?;
    dom.set_layout_rect(main, DOMRect::from_xywh(0.0, 0.0, 960.0, 540.0))?;
    dom.load(main, "feature.mp4")?;

    let host = dom.create_element("embedded-player");
    dom.append_child(body, host)?;
    dom.set_layout_rect(host, DOMRect::from_xywh(0.0, 600.0, 480.0, 270.0))?;
    let shadow = dom.attach_shadow(host, ShadowRootMode::Closed)?;
    let frame = dom.create_element("div");
    dom.add_class(frame, "video-player")?;
    dom.append_child(shadow, frame)?;
    let clip = dom.create_element("video");
    dom.append_child(frame, clip)?;
    dom.set_layout_rect(clip, DOMRect::from_xywh(0.0, 600.0, 480.0, 270.0))?;

    Ok((main, clip))
}

fn report(coordinator: &Coordinator, stage: &str) {
    tracing::info!("[{}] {} controller(s)", stage, coordinator.tracked_count());
    for ctl in coordinator.controllers() {
        tracing::info!(
            "  {} on {}: {} (target {:.2}, enforcing: {})",
            ctl.id(),
            ctl.media(),
            ctl.speed_text(),
            ctl.target_speed(),
            ctl.is_enforcing()
        );
    }
}

fn main() -> Result<()> {
    logging::init("info");

    let mut args = std::env::args().skip(1);
    let settings = load_settings(args.next().as_deref())?;
    let url = args.next().unwrap_or_else(|| "https://www.example.com/watch".to_string());

    tracing::info!("Starting rate-control scenario on {}", url);
    let page = Page::new(&url);
    let store = Rc::new(MemorySettings::new(&settings));
    let coordinator = Coordinator::new(&page, store);
    let policy = coordinator.policy().map_or("inactive", |p| p.name());
    tracing::info!("Policy: {}", policy);

    let (main, clip) = build_page(&page)?;
    page.advance(200.0);
    report(&coordinator, "discovered");

    {
        let mut dom = page.dom_mut();
        dom.set_ready_state(main, ReadyState::HaveEnoughData)?;
        dom.play(main)?;
    }
    let body = page.dom().body();
    for code in ["KeyD", "KeyD", "KeyD"] {
        page.dispatch_event(body, Event::key_down(code));
    }
    page.advance(100.0);
    report(&coordinator, "after keys");

    // a page script resetting the rate is undone
    page.dom_mut().set_playback_rate(main, 1.0)?;
    page.advance(600.0);
    report(&coordinator, "after page reset");

    let response = coordinator.handle_message(ControlMessage::SetSpeed(2.5));
    tracing::info!("SET_SPEED 2.5 -> {}", response.to_json()?);
    let response = coordinator.handle_raw(r#"{"type":"SET_SPEED","payload":"fast"}"#);
    tracing::info!("malformed SET_SPEED -> {}", response.to_json()?);
    let status = coordinator.handle_message(ControlMessage::GetStatus);
    tracing::info!("GET_STATUS -> {}", status.to_json()?);

    page.dom_mut().remove(clip)?;
    page.advance(200.0);
    report(&coordinator, "after removal");

    page.fire_pagehide();
    tracing::info!(
        "Page hidden: torn down {}, {} listener(s), {} timer(s) left",
        coordinator.is_torn_down(),
        page.listener_count(),
        page.timer_count()
    );
    Ok(())
}
