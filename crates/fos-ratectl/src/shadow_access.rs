//! Shadow root access
//!
//! Privileged hosts can read closed shadow roots; everyone else only sees
//! open ones. The best available accessor is chosen once and reused.

use fos_dom::{DomTree, NodeId};
use fos_page::Capabilities;

/// Resolved shadow root accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowAccess {
    /// Open and closed roots
    Privileged,
    /// Open roots only
    OpenOnly,
}

/// Accessors in order of preference
const PREFERENCE: [ShadowAccess; 2] = [ShadowAccess::Privileged, ShadowAccess::OpenOnly];

impl ShadowAccess {
    fn available(self, caps: &Capabilities) -> bool {
        match self {
            ShadowAccess::Privileged => caps.privileged_shadow_access,
            ShadowAccess::OpenOnly => true,
        }
    }

    /// First accessor the host supports
    pub fn resolve(caps: &Capabilities) -> ShadowAccess {
        PREFERENCE
            .into_iter()
            .find(|access| access.available(caps))
            .unwrap_or(ShadowAccess::OpenOnly)
    }

    /// Shadow root of `host`, if readable
    pub fn shadow_root(self, dom: &DomTree, host: NodeId) -> Option<NodeId> {
        match self {
            ShadowAccess::Privileged => dom.shadow_root_privileged(host),
            ShadowAccess::OpenOnly => dom.shadow_root(host),
        }
    }
}
