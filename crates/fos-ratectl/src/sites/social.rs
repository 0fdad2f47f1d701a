//! Social, creator and clip platforms

use fos_dom::{DomTree, NodeId};

use super::{MountPoint, container_or_parent, inside_any, is_looping, is_muted, smaller_than};
use crate::constants::media_size;

// ---- Twitch ----

pub(super) fn twitch_mount(dom: &DomTree, el: NodeId) -> Option<MountPoint> {
    container_or_parent(
        dom,
        el,
        &["[data-a-target=\"video-player\"]", ".clips-player", ".video-player__container"],
    )
}

pub(super) fn twitch_ignore(dom: &DomTree, el: NodeId) -> bool {
    inside_any(
        dom,
        el,
        &[
            "[data-a-target=\"preview-card-image-link\"]",
            ".preview-card-thumbnail",
            ".channel-status-indicator--offline",
        ],
    ) || smaller_than(dom, el, media_size::SOCIAL)
}

// ---- Vimeo ----

pub(super) fn vimeo_mount(dom: &DomTree, el: NodeId) -> Option<MountPoint> {
    container_or_parent(dom, el, &[".vp-video", ".player-container", ".player"])
}

pub(super) fn vimeo_ignore(dom: &DomTree, el: NodeId) -> bool {
    inside_any(dom, el, &[".vp-preview", ".iris_thumbnail"]) || smaller_than(dom, el, media_size::SOCIAL)
}

// ---- Dailymotion ----

pub(super) fn dailymotion_mount(dom: &DomTree, el: NodeId) -> Option<MountPoint> {
    container_or_parent(dom, el, &["#player-wrapper", ".dmp_Player", ".video-container"])
}

pub(super) fn dailymotion_ignore(dom: &DomTree, el: NodeId) -> bool {
    inside_any(
        dom,
        el,
        &[".sidebar", ".video__suggestion", ".ad-container", "[class*=\"ad-\"]"],
    ) || smaller_than(dom, el, media_size::SOCIAL)
}

// ---- Reddit ----

pub(super) fn reddit_mount(dom: &DomTree, el: NodeId) -> Option<MountPoint> {
    container_or_parent(
        dom,
        el,
        &["[data-testid=\"video-player\"]", "shreddit-player", ".reddit-video-player-root"],
    )
}

pub(super) fn reddit_ignore(dom: &DomTree, el: NodeId) -> bool {
    if inside_any(dom, el, &["[data-collapsed=\"true\"]", "[data-testid=\"award-animations\"]"]) {
        return true;
    }
    if is_muted(dom, el) && dom.offset_width(el) < media_size::REDDIT_MUTED_MIN_WIDTH {
        return true;
    }
    smaller_than(dom, el, media_size::REDDIT)
}

// ---- Facebook ----

const FACEBOOK_MUTED_MIN_WIDTH: f64 = 300.0;

pub(super) fn facebook_mount(dom: &DomTree, el: NodeId) -> Option<MountPoint> {
    container_or_parent(
        dom,
        el,
        &[
            "[data-pagelet=\"WatchPermalinkVideo\"]",
            "[data-video-id]",
            "[data-pagelet*=\"Reels\"]",
            "[role=\"presentation\"]",
        ],
    )
}

pub(super) fn facebook_ignore(dom: &DomTree, el: NodeId) -> bool {
    if inside_any(
        dom,
        el,
        &[
            "[data-pagelet=\"Stories\"]",
            "[aria-label*=\"Stories\"]",
            "[data-pagelet=\"ProfilePhoto\"]",
            "[data-ad-preview]",
            "[data-pagelet*=\"AdPreferences\"]",
        ],
    ) {
        return true;
    }
    smaller_than(dom, el, media_size::MIN)
        || (is_muted(dom, el) && dom.offset_width(el) < FACEBOOK_MUTED_MIN_WIDTH)
}

// ---- Twitter / X ----

pub(super) fn twitter_mount(dom: &DomTree, el: NodeId) -> Option<MountPoint> {
    container_or_parent(
        dom,
        el,
        &[
            "[data-testid=\"videoPlayer\"]",
            "[data-testid=\"tweetPhoto\"]",
            "[data-testid=\"videoComponent\"]",
        ],
    )
}

pub(super) fn twitter_ignore(dom: &DomTree, el: NodeId) -> bool {
    if inside_any(dom, el, &["[data-testid=\"UserProfileHeader_Items\"]"]) {
        return true;
    }
    let width = dom.offset_width(el);
    if is_muted(dom, el) && width < media_size::TWITTER_MUTED_MIN_WIDTH {
        return true;
    }
    if smaller_than(dom, el, media_size::TWITTER) {
        return true;
    }
    // Promoted tweets autoplay small inline players
    inside_any(dom, el, &["[data-testid=\"placementTracking\"]"]) && width < media_size::TWITTER_AD_MIN_WIDTH
}

// ---- TikTok ----

pub(super) fn tiktok_mount(dom: &DomTree, el: NodeId) -> Option<MountPoint> {
    container_or_parent(
        dom,
        el,
        &["[data-e2e=\"video-player\"]", "[data-e2e=\"browse-video\"]", ".tiktok-player"],
    )
}

pub(super) fn tiktok_ignore(dom: &DomTree, el: NodeId) -> bool {
    if inside_any(dom, el, &["[data-e2e=\"recommend-list-item\"]", "[data-e2e=\"user-card\"]"]) {
        return true;
    }
    if smaller_than(dom, el, media_size::TIKTOK) {
        return true;
    }
    is_muted(dom, el) && is_looping(dom, el) && dom.offset_height(el) < media_size::TIKTOK_LOOP_MIN_HEIGHT
}

#[cfg(test)]
mod tests {
    use super::super::SitePolicy;
    use fos_dom::{DOMRect, DomTree, NodeId};

    fn video_under(dom: &mut DomTree, attrs: &[(&str, &str)], size: (f64, f64)) -> (NodeId, NodeId) {
        let wrapper = dom.create_element("div");
        for (name, value) in attrs {
            dom.set_attr(wrapper, name, value).unwrap();
        }
        let body = dom.body();
        dom.append_child(body, wrapper).unwrap();
        let video = dom.create_element("video");
        dom.append_child(wrapper, video).unwrap();
        dom.set_layout_rect(video, DOMRect::from_xywh(0.0, 0.0, size.0, size.1)).unwrap();
        (wrapper, video)
    }

    fn set_muted(dom: &mut DomTree, video: NodeId, muted: bool) {
        dom.media_mut(video).unwrap().muted = muted;
    }

    #[test]
    fn test_twitter_player_mount() {
        let mut dom = DomTree::new();
        let (wrapper, video) = video_under(&mut dom, &[("data-testid", "videoPlayer")], (600.0, 340.0));
        assert_eq!(SitePolicy::Twitter.mount_point(&dom, video).unwrap().target, wrapper);
        assert!(!SitePolicy::Twitter.should_ignore(&dom, video));
    }

    #[test]
    fn test_twitter_muted_and_promoted() {
        let mut dom = DomTree::new();
        let (_, video) = video_under(&mut dom, &[("data-testid", "videoPlayer")], (280.0, 200.0));
        assert!(!SitePolicy::Twitter.should_ignore(&dom, video));
        set_muted(&mut dom, video, true);
        assert!(SitePolicy::Twitter.should_ignore(&dom, video));

        let (_, promoted) = video_under(&mut dom, &[("data-testid", "placementTracking")], (380.0, 220.0));
        assert!(SitePolicy::Twitter.should_ignore(&dom, promoted));
    }

    #[test]
    fn test_reddit_thresholds() {
        let mut dom = DomTree::new();
        let (_, video) = video_under(&mut dom, &[], (350.0, 250.0));
        assert!(!SitePolicy::Reddit.should_ignore(&dom, video));
        set_muted(&mut dom, video, true);
        assert!(SitePolicy::Reddit.should_ignore(&dom, video));

        let (_, collapsed) = video_under(&mut dom, &[("data-collapsed", "true")], (800.0, 450.0));
        assert!(SitePolicy::Reddit.should_ignore(&dom, collapsed));
    }

    #[test]
    fn test_tiktok_muted_loop() {
        let mut dom = DomTree::new();
        let (wrapper, video) = video_under(&mut dom, &[("data-e2e", "browse-video")], (300.0, 380.0));
        assert_eq!(SitePolicy::TikTok.mount_point(&dom, video).unwrap().target, wrapper);
        assert!(!SitePolicy::TikTok.should_ignore(&dom, video));
        {
            let media = dom.media_mut(video).unwrap();
            media.muted = true;
            media.loop_ = true;
        }
        assert!(SitePolicy::TikTok.should_ignore(&dom, video));
    }

    #[test]
    fn test_facebook_stories() {
        let mut dom = DomTree::new();
        let (_, story) = video_under(&mut dom, &[("aria-label", "Stories tray")], (400.0, 700.0));
        assert!(SitePolicy::Facebook.should_ignore(&dom, story));
        let (wrapper, watch) = video_under(&mut dom, &[("data-video-id", "123")], (640.0, 360.0));
        assert!(!SitePolicy::Facebook.should_ignore(&dom, watch));
        assert_eq!(SitePolicy::Facebook.mount_point(&dom, watch).unwrap().target, wrapper);
    }

    #[test]
    fn test_dailymotion_ad_class_fragment() {
        let mut dom = DomTree::new();
        let (_, ad) = video_under(&mut dom, &[("class", "promo ad-slot")], (640.0, 360.0));
        assert!(SitePolicy::Dailymotion.should_ignore(&dom, ad));
    }

    #[test]
    fn test_unmatched_container_uses_parent() {
        let mut dom = DomTree::new();
        let (wrapper, video) = video_under(&mut dom, &[], (640.0, 360.0));
        for policy in [SitePolicy::Twitch, SitePolicy::Vimeo, SitePolicy::Reddit] {
            assert_eq!(policy.mount_point(&dom, video).unwrap().target, wrapper);
        }
    }
}
