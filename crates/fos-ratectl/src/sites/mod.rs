//! Site Policy Registry
//!
//! Per-site knowledge of where the overlay should be mounted and which
//! media elements are ads, previews or decorative loops. A policy is
//! selected once per page from the hostname; `Generic` is the fallback.

mod generic;
mod social;
mod streaming;

use fos_dom::{DomTree, NodeId};

/// How the overlay is inserted relative to a mount target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// First child of the target
    #[default]
    Prepend,
    /// Last child of the target
    Append,
    /// Previous sibling of the target
    Before,
    /// Next sibling of the target
    After,
}

/// Where a controller overlay goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountPoint {
    pub target: NodeId,
    pub placement: Placement,
}

impl MountPoint {
    pub fn prepend(target: NodeId) -> Self {
        Self { target, placement: Placement::Prepend }
    }

    /// Element that becomes the overlay's parent
    pub fn parent(&self, dom: &DomTree) -> Option<NodeId> {
        match self.placement {
            Placement::Prepend | Placement::Append => Some(self.target),
            Placement::Before | Placement::After => dom.parent(self.target),
        }
    }
}

/// Site-specific mounting and filtering rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitePolicy {
    YouTube,
    Netflix,
    Amazon,
    /// Disney+, Hulu and Hotstar share one player family
    Disney,
    Twitch,
    Max,
    Crunchyroll,
    Vimeo,
    Dailymotion,
    Reddit,
    Facebook,
    Twitter,
    TikTok,
    Generic,
}

/// Policies in resolution order; `Generic` must stay last
pub const REGISTRY: [SitePolicy; 14] = [
    SitePolicy::YouTube,
    SitePolicy::Netflix,
    SitePolicy::Amazon,
    SitePolicy::Disney,
    SitePolicy::Twitch,
    SitePolicy::Max,
    SitePolicy::Crunchyroll,
    SitePolicy::Vimeo,
    SitePolicy::Dailymotion,
    SitePolicy::Reddit,
    SitePolicy::Facebook,
    SitePolicy::Twitter,
    SitePolicy::TikTok,
    SitePolicy::Generic,
];

const AMAZON_DOMAINS: &[&str] = &[
    "primevideo.com",
    "amazon.com",
    "amazon.co.uk",
    "amazon.de",
    "amazon.fr",
    "amazon.es",
    "amazon.it",
    "amazon.co.jp",
    "amazon.in",
    "amazon.com.br",
    "amazon.com.mx",
    "amazon.com.au",
    "amazon.nl",
    "amazon.se",
    "amazon.pl",
    "amazon.sg",
    "amazon.ae",
    "amazon.sa",
    "amazon.eg",
    "amazon.ca",
];

impl SitePolicy {
    /// First registered policy matching `hostname`
    pub fn resolve(hostname: &str) -> SitePolicy {
        let host = hostname.to_ascii_lowercase();
        let policy = REGISTRY
            .into_iter()
            .find(|policy| policy.matches(&host))
            .unwrap_or(SitePolicy::Generic);
        tracing::debug!("Site policy for '{}': {}", hostname, policy.name());
        policy
    }

    pub fn name(self) -> &'static str {
        match self {
            SitePolicy::YouTube => "youtube",
            SitePolicy::Netflix => "netflix",
            SitePolicy::Amazon => "amazon",
            SitePolicy::Disney => "disney",
            SitePolicy::Twitch => "twitch",
            SitePolicy::Max => "max",
            SitePolicy::Crunchyroll => "crunchyroll",
            SitePolicy::Vimeo => "vimeo",
            SitePolicy::Dailymotion => "dailymotion",
            SitePolicy::Reddit => "reddit",
            SitePolicy::Facebook => "facebook",
            SitePolicy::Twitter => "twitter",
            SitePolicy::TikTok => "tiktok",
            SitePolicy::Generic => "generic",
        }
    }

    /// Registered domains; empty for `Generic`
    pub fn domains(self) -> &'static [&'static str] {
        match self {
            SitePolicy::YouTube => &["youtube.com", "youtu.be"],
            SitePolicy::Netflix => &["netflix.com"],
            SitePolicy::Amazon => AMAZON_DOMAINS,
            SitePolicy::Disney => &["disneyplus.com", "hulu.com", "hotstar.com"],
            SitePolicy::Twitch => &["twitch.tv"],
            SitePolicy::Max => &["max.com", "hbomax.com"],
            SitePolicy::Crunchyroll => &["crunchyroll.com"],
            SitePolicy::Vimeo => &["vimeo.com", "player.vimeo.com"],
            SitePolicy::Dailymotion => &["dailymotion.com"],
            SitePolicy::Reddit => &["reddit.com", "redd.it"],
            SitePolicy::Facebook => &["facebook.com", "fb.com", "fb.watch"],
            SitePolicy::Twitter => &["twitter.com", "x.com"],
            SitePolicy::TikTok => &["tiktok.com"],
            SitePolicy::Generic => &[],
        }
    }

    pub fn matches(self, hostname: &str) -> bool {
        self == SitePolicy::Generic || matches_domains(hostname, self.domains())
    }

    /// Mount point for the overlay of `el`
    pub fn mount_point(self, dom: &DomTree, el: NodeId) -> Option<MountPoint> {
        match self {
            SitePolicy::YouTube => streaming::youtube_mount(dom, el),
            SitePolicy::Netflix => streaming::netflix_mount(dom, el),
            SitePolicy::Amazon => streaming::amazon_mount(dom, el),
            SitePolicy::Disney => streaming::disney_mount(dom, el),
            SitePolicy::Max => streaming::max_mount(dom, el),
            SitePolicy::Crunchyroll => streaming::crunchyroll_mount(dom, el),
            SitePolicy::Twitch => social::twitch_mount(dom, el),
            SitePolicy::Vimeo => social::vimeo_mount(dom, el),
            SitePolicy::Dailymotion => social::dailymotion_mount(dom, el),
            SitePolicy::Reddit => social::reddit_mount(dom, el),
            SitePolicy::Facebook => social::facebook_mount(dom, el),
            SitePolicy::Twitter => social::twitter_mount(dom, el),
            SitePolicy::TikTok => social::tiktok_mount(dom, el),
            SitePolicy::Generic => generic::mount(dom, el),
        }
    }

    /// Whether `el` is an ad, preview, decoration or too small to control
    pub fn should_ignore(self, dom: &DomTree, el: NodeId) -> bool {
        match self {
            SitePolicy::YouTube => streaming::youtube_ignore(dom, el),
            SitePolicy::Netflix => streaming::netflix_ignore(dom, el),
            SitePolicy::Amazon => streaming::amazon_ignore(dom, el),
            SitePolicy::Disney => streaming::disney_ignore(dom, el),
            SitePolicy::Max => streaming::max_ignore(dom, el),
            SitePolicy::Crunchyroll => streaming::crunchyroll_ignore(dom, el),
            SitePolicy::Twitch => social::twitch_ignore(dom, el),
            SitePolicy::Vimeo => social::vimeo_ignore(dom, el),
            SitePolicy::Dailymotion => social::dailymotion_ignore(dom, el),
            SitePolicy::Reddit => social::reddit_ignore(dom, el),
            SitePolicy::Facebook => social::facebook_ignore(dom, el),
            SitePolicy::Twitter => social::twitter_ignore(dom, el),
            SitePolicy::TikTok => social::tiktok_ignore(dom, el),
            SitePolicy::Generic => false,
        }
    }
}

/// Exact hostname or a subdomain of one of `domains`
pub fn matches_domains(hostname: &str, domains: &[&str]) -> bool {
    domains.iter().any(|domain| {
        hostname == *domain
            || hostname
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

// ---- helpers shared by the site modules ----

/// `closest()` for each selector in turn; the first selector with a match wins
fn closest_any(dom: &DomTree, el: NodeId, selectors: &[&str]) -> Option<NodeId> {
    selectors.iter().find_map(|selector| dom.closest(el, selector))
}

fn inside_any(dom: &DomTree, el: NodeId, selectors: &[&str]) -> bool {
    closest_any(dom, el, selectors).is_some()
}

/// Site container, else the element's parent
fn container_or_parent(dom: &DomTree, el: NodeId, selectors: &[&str]) -> Option<MountPoint> {
    closest_any(dom, el, selectors)
        .or_else(|| dom.parent_element(el))
        .map(MountPoint::prepend)
}

/// Rendered box narrower or shorter than `min`
fn smaller_than(dom: &DomTree, el: NodeId, min: (f64, f64)) -> bool {
    let rect = dom.bounding_client_rect(el);
    rect.width < min.0 || rect.height < min.1
}

fn is_muted(dom: &DomTree, el: NodeId) -> bool {
    dom.media(el).is_some_and(|m| m.muted)
}

fn is_looping(dom: &DomTree, el: NodeId) -> bool {
    dom.media(el).is_some_and(|m| m.loop_)
}
