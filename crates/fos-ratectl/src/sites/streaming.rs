//! Subscription streaming services

use fos_dom::{DomTree, NodeId};

use super::{MountPoint, closest_any, container_or_parent, inside_any, smaller_than};
use crate::constants::media_size;

// ---- YouTube ----

pub(super) fn youtube_mount(dom: &DomTree, el: NodeId) -> Option<MountPoint> {
    closest_any(dom, el, &[".html5-video-player", ".html5-video-container"])
        .or_else(|| dom.parent_element(el).and_then(|p| dom.parent_element(p)))
        .map(MountPoint::prepend)
}

pub(super) fn youtube_ignore(dom: &DomTree, el: NodeId) -> bool {
    inside_any(
        dom,
        el,
        &[
            ".ytp-ad-player-overlay",
            ".ytp-ad-module",
            "ytd-shorts",
            "ytd-reel-video-renderer",
            "ytmusic-player-bar",
            ".ytmusic-player-bar",
            "#channel-header-container",
            "#video-preview",
            "ytd-video-preview",
        ],
    ) || smaller_than(dom, el, media_size::MIN)
}

// ---- Netflix ----

pub(super) fn netflix_mount(dom: &DomTree, el: NodeId) -> Option<MountPoint> {
    container_or_parent(dom, el, &[".watch-video--player-view", ".NFPlayer"])
}

pub(super) fn netflix_ignore(dom: &DomTree, el: NodeId) -> bool {
    dom.has_class(el, "preview-video")
        || inside_any(
            dom,
            el,
            &[
                ".billboard-row",
                ".jawBone",
                "[data-uia=\"billboard\"]",
                "[data-uia=\"hero-billboard\"]",
                ".moreLikeThis",
                "[data-uia=\"more-like-this\"]",
                ".title-card",
                ".slider-item",
            ],
        )
        || smaller_than(dom, el, media_size::STREAMING)
}

// ---- Amazon / Prime Video ----

pub(super) fn amazon_mount(dom: &DomTree, el: NodeId) -> Option<MountPoint> {
    if let Some(tech_parent) = dom.closest(el, ".vjs-tech").and_then(|t| dom.parent_element(t)) {
        return Some(MountPoint::prepend(tech_parent));
    }
    container_or_parent(dom, el, &[".webPlayerContainer"])
}

pub(super) fn amazon_ignore(dom: &DomTree, el: NodeId) -> bool {
    smaller_than(dom, el, media_size::AMAZON) || inside_any(dom, el, &[".a-image-wrapper", ".imageBlock"])
}

// ---- Disney+ / Hulu / Hotstar ----

pub(super) fn disney_mount(dom: &DomTree, el: NodeId) -> Option<MountPoint> {
    container_or_parent(
        dom,
        el,
        &[
            "[data-testid=\"btm-media-client-wrapper\"]",
            ".Player__container",
            ".player-base",
            "[class*=\"player\"]",
            "[class*=\"Player\"]",
        ],
    )
}

pub(super) fn disney_ignore(dom: &DomTree, el: NodeId) -> bool {
    inside_any(
        dom,
        el,
        &["[data-testid=\"preview-player\"]", ".background-video", "[class*=\"background\"]"],
    ) || smaller_than(dom, el, media_size::SOCIAL)
}

// ---- Max ----

pub(super) fn max_mount(dom: &DomTree, el: NodeId) -> Option<MountPoint> {
    container_or_parent(
        dom,
        el,
        &["[data-testid=\"player\"]", ".VideoPlayer", "[class*=\"PlayerContainer\"]"],
    )
}

pub(super) fn max_ignore(dom: &DomTree, el: NodeId) -> bool {
    inside_any(
        dom,
        el,
        &["[data-testid=\"trailer-player\"]", ".HeroPlayer", "[class*=\"Preview\"]"],
    ) || smaller_than(dom, el, media_size::STREAMING)
}

// ---- Crunchyroll ----

pub(super) fn crunchyroll_mount(dom: &DomTree, el: NodeId) -> Option<MountPoint> {
    container_or_parent(
        dom,
        el,
        &["#vilos", "[data-testid=\"vilos-player\"]", ".video-player", ".erc-video-player"],
    )
}

pub(super) fn crunchyroll_ignore(dom: &DomTree, el: NodeId) -> bool {
    inside_any(
        dom,
        el,
        &["[data-testid=\"trailer-player\"]", ".hero-carousel", "[class*=\"Hero\"]", ".browse-card"],
    ) || smaller_than(dom, el, media_size::STREAMING)
}
