//! The display surface the renderer, loaders and pollers mutate.
//!
//! [`Document`] is the adapter seam: rendering produces plain [`Node`] trees and
//! everything that touches the page goes through this trait. [`MemoryDocument`]
//! is an arena-backed implementation that can be serialized back to HTML.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::view::{Element, Node};

/// Handle to an element inside a document. Slots of removed elements are
/// recycled, but each reuse bumps the slot's generation, so a handle to a
/// removed element stays stale instead of aliasing its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// A document shared between the renderer, pollers and timers.
pub type SharedDocument<D> = Arc<Mutex<D>>;

/// Lock a shared document. Poisoning only means another task panicked
/// mid-mutation; the tree itself is still structurally valid.
pub fn lock<D: ?Sized>(doc: &Mutex<D>) -> MutexGuard<'_, D> {
    doc.lock().unwrap_or_else(PoisonError::into_inner)
}

pub trait Document {
    fn root(&self) -> NodeId;
    fn element_by_id(&self, id: &str) -> Option<NodeId>;
    fn tag(&self, node: NodeId) -> Option<&str>;
    fn attr(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attr(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attr(&mut self, node: NodeId, name: &str);
    /// Concatenated text of all descendants.
    fn text(&self, node: NodeId) -> String;
    /// Replace all children with a single text node.
    fn set_text(&mut self, node: NodeId, text: &str);
    fn replace_children(&mut self, parent: NodeId, nodes: &[Node]);
    /// Descendant elements of `node` in document order, `node` excluded.
    fn descendants(&self, node: NodeId) -> Vec<NodeId>;
    /// Whether `node` is still reachable from the root.
    fn is_connected(&self, node: NodeId) -> bool;
    fn scroll_into_view(&mut self, node: NodeId);

    fn elements(&self) -> Vec<NodeId> {
        let root = self.root();
        let mut all = vec![root];
        all.extend(self.descendants(root));
        all
    }

    fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.elements().into_iter().filter(|&n| self.tag(n) == Some(tag)).collect()
    }

    fn elements_by_class(&self, class: &str) -> Vec<NodeId> {
        self.elements().into_iter().filter(|&n| self.has_class(n, class)).collect()
    }

    /// Ids of every element whose id starts with `prefix`, in document order.
    fn ids_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.elements()
            .into_iter()
            .filter_map(|n| self.attr(n, "id"))
            .filter(|id| id.starts_with(prefix))
            .collect()
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class").is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let classes = match self.attr(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr(node, "class", &classes);
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        let Some(existing) = self.attr(node, "class") else { return };
        if !existing.split_whitespace().any(|c| c == class) {
            return;
        }
        let kept: Vec<&str> = existing.split_whitespace().filter(|c| *c != class).collect();
        self.set_attr(node, "class", &kept.join(" "));
    }

    fn toggle_class(&mut self, node: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }
}

#[derive(Debug, Clone)]
enum Data {
    Element { tag: String, attrs: Vec<(String, String)> },
    Text(String),
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: Data,
}

/// In-memory document tree. Removed subtrees go back to a free list, so a page
/// that is re-rendered in place keeps a flat footprint.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeId,
    revision: u64,
    scrolled: Option<NodeId>,
}

impl MemoryDocument {
    pub fn new(root: Element) -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId { index: 0, generation: 0 },
            revision: 0,
            scrolled: None,
        };
        doc.root = doc.insert(None, &Node::Element(root));
        doc
    }

    /// Bumped on every mutation; lets writers skip unchanged snapshots.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The element most recently scrolled into view.
    pub fn scrolled_to(&self) -> Option<NodeId> {
        self.scrolled
    }

    /// Allocated slots, live or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slots currently holding a node reachable from the root.
    pub fn live_nodes(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn to_node(&self, node: NodeId) -> Option<Node> {
        let slot = self.slot(node)?;
        Some(match &slot.data {
            Data::Text(t) => Node::Text(t.clone()),
            Data::Element { tag, attrs } => Node::Element(Element {
                tag: tag.clone(),
                attrs: attrs.clone(),
                children: slot.children.iter().filter_map(|&c| self.to_node(c)).collect(),
            }),
        })
    }

    pub fn to_html(&self) -> String {
        let body = self.to_node(self.root).map(|n| n.to_html()).unwrap_or_default();
        format!("<!DOCTYPE html>\n{body}\n")
    }

    fn slot(&self, node: NodeId) -> Option<&Slot> {
        self.slots.get(node.index).filter(|s| s.generation == node.generation)
    }

    fn slot_mut(&mut self, node: NodeId) -> Option<&mut Slot> {
        self.slots.get_mut(node.index).filter(|s| s.generation == node.generation)
    }

    fn insert(&mut self, parent: Option<NodeId>, node: &Node) -> NodeId {
        let data = match node {
            Node::Text(t) => Data::Text(t.clone()),
            Node::Element(el) => Data::Element { tag: el.tag.clone(), attrs: el.attrs.clone() },
        };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.parent = parent;
                slot.data = data;
                NodeId { index, generation: slot.generation }
            }
            None => {
                self.slots.push(Slot { generation: 0, parent, children: Vec::new(), data });
                NodeId { index: self.slots.len() - 1, generation: 0 }
            }
        };
        if let Node::Element(el) = node {
            let children: Vec<NodeId> = el.children.iter().map(|c| self.insert(Some(id), c)).collect();
            self.slots[id.index].children = children;
        }
        id
    }

    /// Free `node` and its whole subtree, invalidating their handles.
    fn release(&mut self, node: NodeId) {
        let Some(slot) = self.slot_mut(node) else { return };
        let children = std::mem::take(&mut slot.children);
        slot.parent = None;
        slot.data = Data::Text(String::new());
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(node.index);
        if self.scrolled == Some(node) {
            self.scrolled = None;
        }
        for child in children {
            self.release(child);
        }
    }

    fn attrs_mut(&mut self, node: NodeId) -> Option<&mut Vec<(String, String)>> {
        match self.slot_mut(node).map(|s| &mut s.data) {
            Some(Data::Element { attrs, .. }) => Some(attrs),
            _ => None,
        }
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(slot) = self.slot(node) else { return };
        match &slot.data {
            Data::Text(t) => out.push_str(t),
            Data::Element { .. } => {
                for &c in &slot.children {
                    self.collect_text(c, out);
                }
            }
        }
    }
}

impl Document for MemoryDocument {
    fn root(&self) -> NodeId {
        self.root
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements().into_iter().find(|&n| self.attr(n, "id").as_deref() == Some(id))
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.slot(node)?.data {
            Data::Element { tag, .. } => Some(tag),
            Data::Text(_) => None,
        }
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        match &self.slot(node)?.data {
            Data::Element { attrs, .. } => attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone()),
            Data::Text(_) => None,
        }
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(attrs) = self.attrs_mut(node) else { return };
        match attrs.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
        self.revision += 1;
    }

    fn remove_attr(&mut self, node: NodeId, name: &str) {
        let Some(attrs) = self.attrs_mut(node) else { return };
        let before = attrs.len();
        attrs.retain(|(n, _)| n != name);
        if attrs.len() != before {
            self.revision += 1;
        }
    }

    fn text(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if self.tag(node).is_none() {
            return;
        }
        // A lone text child is rewritten in place.
        let lone = match self.slots[node.index].children.as_slice() {
            [only] => Some(*only),
            _ => None,
        };
        if let Some(only) = lone {
            if let Some(Slot { data: Data::Text(existing), .. }) = self.slot_mut(only) {
                existing.clear();
                existing.push_str(text);
                self.revision += 1;
                return;
            }
        }
        self.replace_children(node, &[Node::Text(text.to_string())]);
    }

    fn replace_children(&mut self, parent: NodeId, nodes: &[Node]) {
        if self.tag(parent).is_none() {
            return;
        }
        for child in std::mem::take(&mut self.slots[parent.index].children) {
            self.release(child);
        }
        let children: Vec<NodeId> = nodes.iter().map(|n| self.insert(Some(parent), n)).collect();
        self.slots[parent.index].children = children;
        self.revision += 1;
    }

    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(slot) = self.slot(node) else { return out };
        let mut stack: Vec<NodeId> = slot.children.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            let Some(slot) = self.slot(n) else { continue };
            if let Data::Element { .. } = slot.data {
                out.push(n);
                stack.extend(slot.children.iter().rev());
            }
        }
        out
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(n) = cursor {
            if n == self.root {
                return true;
            }
            cursor = self.slot(n).and_then(|s| s.parent);
        }
        false
    }

    fn scroll_into_view(&mut self, node: NodeId) {
        if self.slot(node).is_some() {
            self.scrolled = Some(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryDocument {
        MemoryDocument::new(
            Element::new("body")
                .child(Element::new("div").id("list").class("grid wide").child(Element::new("span").id("a-1").text("0")))
                .child(Element::new("span").id("a-2").text("0"))
                .child(Element::new("span").id("b-1")),
        )
    }

    #[test]
    fn finds_ids_by_prefix_in_document_order() {
        let doc = sample();
        assert_eq!(doc.ids_with_prefix("a-"), ["a-1", "a-2"]);
    }

    #[test]
    fn class_helpers_keep_other_classes() {
        let mut doc = sample();
        let list = doc.element_by_id("list").unwrap();
        doc.add_class(list, "active");
        doc.add_class(list, "active");
        assert_eq!(doc.attr(list, "class").as_deref(), Some("grid wide active"));
        doc.remove_class(list, "wide");
        assert_eq!(doc.attr(list, "class").as_deref(), Some("grid active"));
        doc.toggle_class(list, "active", false);
        assert!(!doc.has_class(list, "active"));
    }

    #[test]
    fn replaced_children_are_disconnected() {
        let mut doc = sample();
        let list = doc.element_by_id("list").unwrap();
        let old = doc.element_by_id("a-1").unwrap();
        doc.replace_children(list, &[Element::new("p").text("empty").into()]);
        assert!(!doc.is_connected(old));
        assert!(doc.element_by_id("a-1").is_none());
        assert_eq!(doc.text(list), "empty");
    }

    #[test]
    fn revision_tracks_mutations() {
        let mut doc = sample();
        let start = doc.revision();
        let span = doc.element_by_id("a-2").unwrap();
        doc.set_text(span, "5");
        doc.remove_attr(span, "missing");
        assert_eq!(doc.revision(), start + 1);
        assert_eq!(doc.text(span), "5");
    }

    #[test]
    fn serializes_back_to_html() {
        let doc = MemoryDocument::new(Element::new("html").child(Element::new("p").id("x").text("hi")));
        assert_eq!(doc.to_html(), "<!DOCTYPE html>\n<html><p id=\"x\">hi</p></html>\n");
    }

    #[test]
    fn repeated_text_updates_do_not_grow_the_arena() {
        let mut doc = sample();
        let span = doc.element_by_id("a-1").unwrap();
        let capacity = doc.capacity();
        for i in 0..10_000 {
            doc.set_text(span, &i.to_string());
        }
        assert_eq!(doc.capacity(), capacity);
        assert_eq!(doc.text(span), "9999");
    }

    #[test]
    fn rerendering_reuses_freed_slots() {
        let mut doc = sample();
        let list = doc.element_by_id("list").unwrap();
        let cards = [Element::new("div").class("card").child(Element::new("img").attr("data-src", "x.png")).into()];
        doc.replace_children(list, &cards);
        let capacity = doc.capacity();
        let live = doc.live_nodes();
        for _ in 0..100 {
            doc.replace_children(list, &cards);
        }
        assert_eq!(doc.capacity(), capacity);
        assert_eq!(doc.live_nodes(), live);
    }

    #[test]
    fn recycled_slot_does_not_revive_old_handle() {
        let mut doc = sample();
        let list = doc.element_by_id("list").unwrap();
        let old = doc.element_by_id("a-1").unwrap();
        doc.replace_children(list, &[Element::new("span").id("fresh").into()]);
        let fresh = doc.element_by_id("fresh").unwrap();
        assert_ne!(old, fresh);
        assert!(doc.attr(old, "id").is_none());
        assert!(doc.is_connected(fresh));
    }
}
