//! Deferred image loading and broken-image fallback.

use std::collections::HashSet;

use crate::dom::{Document, NodeId};
use crate::types::{DEFAULT_IMAGE, DEFAULT_PROFILE};

/// Attribute holding an image's real source until it nears the viewport.
pub const DEFERRED_SRC: &str = "data-src";
/// Attribute holding the asset to substitute when the image fails to load.
pub const FALLBACK_SRC: &str = "data-fallback";
const ERROR_HANDLED: &str = "data-error-handled";

/// Default distance (logical px) outside the viewport at which images start loading.
pub const DEFAULT_MARGIN_PX: u32 = 200;

/// Viewport-proximity observation, when the environment offers one.
pub trait ProximityObserver {
    fn observe(&mut self, node: NodeId, margin_px: u32);
    fn unobserve(&mut self, node: NodeId);
    fn is_observing(&self, node: NodeId) -> bool;
}

/// Observer that only records registrations; the embedder reports intersections.
#[derive(Debug, Default)]
pub struct ObservedSet {
    nodes: HashSet<NodeId>,
    margin_px: u32,
}

impl ObservedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn margin_px(&self) -> u32 {
        self.margin_px
    }

    /// Forget images that a later render pass removed from the page.
    pub fn prune<D: Document + ?Sized>(&mut self, doc: &D) {
        self.nodes.retain(|&n| doc.is_connected(n));
    }
}

impl ProximityObserver for ObservedSet {
    fn observe(&mut self, node: NodeId, margin_px: u32) {
        self.margin_px = margin_px;
        self.nodes.insert(node);
    }

    fn unobserve(&mut self, node: NodeId) {
        self.nodes.remove(&node);
    }

    fn is_observing(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LazyImageLoader {
    margin_px: u32,
}

impl Default for LazyImageLoader {
    fn default() -> Self {
        Self { margin_px: DEFAULT_MARGIN_PX }
    }
}

impl LazyImageLoader {
    pub fn new(margin_px: u32) -> Self {
        Self { margin_px }
    }

    /// Arm every image that still carries a deferred source. Without an
    /// observer the sources are assigned straight away. Must run after each
    /// render pass, since rendering creates images nothing tracks yet.
    /// Returns how many images were registered or resolved.
    pub fn activate<D: Document + ?Sized>(&self, doc: &mut D, observer: Option<&mut dyn ProximityObserver>) -> usize {
        let pending: Vec<NodeId> = doc
            .elements_by_tag("img")
            .into_iter()
            .filter(|&img| doc.attr(img, DEFERRED_SRC).is_some())
            .collect();

        match observer {
            Some(observer) => {
                let mut armed = 0;
                for img in pending {
                    if !observer.is_observing(img) {
                        observer.observe(img, self.margin_px);
                        armed += 1;
                    }
                }
                armed
            }
            None => pending.into_iter().filter(|&img| resolve(doc, img)).count(),
        }
    }

    /// The observer reported `node` within the margin: load it and stop watching.
    pub fn on_intersect<D: Document + ?Sized>(&self, doc: &mut D, observer: &mut dyn ProximityObserver, node: NodeId) -> bool {
        if !observer.is_observing(node) {
            return false;
        }
        observer.unobserve(node);
        resolve(doc, node)
    }
}

/// Move the deferred source into `src`, consuming the marker.
fn resolve<D: Document + ?Sized>(doc: &mut D, img: NodeId) -> bool {
    let Some(src) = doc.attr(img, DEFERRED_SRC) else { return false };
    doc.set_attr(img, "src", &src);
    doc.remove_attr(img, DEFERRED_SRC);
    true
}

/// Swap a broken image for its default asset. Only the first failure of an
/// element is handled; returns whether a substitution happened.
pub fn handle_image_error<D: Document + ?Sized>(doc: &mut D, img: NodeId) -> bool {
    if doc.attr(img, ERROR_HANDLED).is_some() {
        return false;
    }
    let fallback = match doc.attr(img, FALLBACK_SRC) {
        Some(fallback) => fallback,
        None if doc.has_class(img, "profile-img") => DEFAULT_PROFILE.to_string(),
        None => DEFAULT_IMAGE.to_string(),
    };
    tracing::debug!(?img, %fallback, "image failed to load; using fallback");
    doc.set_attr(img, "src", &fallback);
    doc.set_attr(img, ERROR_HANDLED, "true");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;
    use crate::view::Element;

    fn page() -> MemoryDocument {
        MemoryDocument::new(
            Element::new("body")
                .child(Element::new("img").id("a").attr(DEFERRED_SRC, "a.png").attr(FALLBACK_SRC, "fallback.png"))
                .child(Element::new("img").id("b").attr(DEFERRED_SRC, "b.png"))
                .child(Element::new("img").id("static").attr("src", "logo.png").class("profile-img")),
        )
    }

    fn src(doc: &MemoryDocument, id: &str) -> Option<String> {
        doc.attr(doc.element_by_id(id).unwrap(), "src")
    }

    #[test]
    fn without_observer_all_sources_are_assigned() {
        let mut doc = page();
        let loader = LazyImageLoader::default();
        assert_eq!(loader.activate(&mut doc, None), 2);
        assert_eq!(src(&doc, "a").as_deref(), Some("a.png"));
        assert_eq!(src(&doc, "b").as_deref(), Some("b.png"));
        assert_eq!(src(&doc, "static").as_deref(), Some("logo.png"));
    }

    #[test]
    fn second_activation_is_a_no_op() {
        let mut doc = page();
        let loader = LazyImageLoader::default();
        loader.activate(&mut doc, None);
        let rev = doc.revision();
        assert_eq!(loader.activate(&mut doc, None), 0);
        assert_eq!(doc.revision(), rev);
    }

    #[test]
    fn observed_images_load_once_on_intersection() {
        let mut doc = page();
        let loader = LazyImageLoader::new(200);
        let mut observer = ObservedSet::new();
        assert_eq!(loader.activate(&mut doc, Some(&mut observer)), 2);
        assert_eq!(observer.margin_px(), 200);
        assert_eq!(src(&doc, "a"), None);

        // Re-activation does not double-register.
        assert_eq!(loader.activate(&mut doc, Some(&mut observer)), 0);
        assert_eq!(observer.len(), 2);

        let a = doc.element_by_id("a").unwrap();
        assert!(loader.on_intersect(&mut doc, &mut observer, a));
        assert!(!loader.on_intersect(&mut doc, &mut observer, a));
        assert_eq!(src(&doc, "a").as_deref(), Some("a.png"));
        assert_eq!(observer.len(), 1);
    }

    #[test]
    fn prune_drops_removed_images() {
        let mut doc = page();
        let mut observer = ObservedSet::new();
        LazyImageLoader::default().activate(&mut doc, Some(&mut observer));
        let root = doc.root();
        doc.replace_children(root, &[]);
        observer.prune(&doc);
        assert!(observer.is_empty());
    }

    #[test]
    fn image_errors_fall_back_once() {
        let mut doc = page();
        let a = doc.element_by_id("a").unwrap();
        assert!(handle_image_error(&mut doc, a));
        assert_eq!(src(&doc, "a").as_deref(), Some("fallback.png"));
        doc.set_attr(a, "src", "still-broken.png");
        assert!(!handle_image_error(&mut doc, a));
        assert_eq!(src(&doc, "a").as_deref(), Some("still-broken.png"));
    }

    #[test]
    fn profile_images_fall_back_to_profile_default() {
        let mut doc = page();
        let img = doc.element_by_id("static").unwrap();
        handle_image_error(&mut doc, img);
        assert_eq!(src(&doc, "static").as_deref(), Some(DEFAULT_PROFILE));
        let b = doc.element_by_id("b").unwrap();
        handle_image_error(&mut doc, b);
        assert_eq!(src(&doc, "b").as_deref(), Some(DEFAULT_IMAGE));
    }
}
