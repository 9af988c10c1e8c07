//! Single-page section switching driven by nav links, controls and history.

use crate::dom::{Document, NodeId};

const ACTIVE: &str = "active";

/// Browser-history surface the navigator pushes fragments into.
pub trait History {
    /// Current location fragment without the leading `#`, if any.
    fn fragment(&self) -> Option<String>;
    fn push(&mut self, fragment: &str);
}

/// History kept in memory, with back/forward over pushed entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    entries: Vec<String>,
    cursor: usize,
}

impl MemoryHistory {
    pub fn new(initial: Option<&str>) -> Self {
        let first = initial.map(|f| f.trim_start_matches('#').to_string()).unwrap_or_default();
        Self { entries: vec![first], cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Step back one entry; `false` at the start of history.
    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        true
    }
}

impl History for MemoryHistory {
    fn fragment(&self) -> Option<String> {
        self.entries.get(self.cursor).filter(|f| !f.is_empty()).cloned()
    }

    fn push(&mut self, fragment: &str) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(fragment.trim_start_matches('#').to_string());
        self.cursor = self.entries.len() - 1;
    }
}

/// Something the user did that may switch sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    /// A navigation link with this `href` was clicked.
    LinkClicked(String),
    /// A secondary control (by element id) was clicked.
    ControlClicked(String),
    /// Back/forward moved the history cursor.
    PopState,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    sections: Vec<String>,
    controls: Vec<(String, String)>,
    active: Option<String>,
}

impl Navigator {
    /// Read sections from the page and settle the initial active section:
    /// the history fragment when it names a section, else whatever the markup
    /// marks active.
    pub fn init<D: Document + ?Sized, H: History + ?Sized>(doc: &mut D, history: &H, controls: Vec<(String, String)>) -> Self {
        let sections: Vec<String> = doc
            .elements_by_class("section")
            .into_iter()
            .filter_map(|n| doc.attr(n, "id"))
            .collect();
        let active = doc
            .elements_by_class("section")
            .into_iter()
            .find(|&n| doc.has_class(n, ACTIVE))
            .and_then(|n| doc.attr(n, "id"));
        let mut nav = Self { sections, controls, active };
        if let Some(fragment) = history.fragment() {
            if nav.is_section(&fragment) {
                nav.apply(doc, &fragment);
            }
        }
        tracing::debug!(sections = ?nav.sections, active = ?nav.active, "navigation ready");
        nav
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    pub fn is_section(&self, id: &str) -> bool {
        self.sections.iter().any(|s| s == id)
    }

    /// Feed one event through the state machine. Returns whether the active
    /// section changed; unknown targets leave everything untouched.
    pub fn handle<D: Document + ?Sized, H: History + ?Sized>(&mut self, doc: &mut D, history: &mut H, event: NavEvent) -> bool {
        let (target, push) = match &event {
            NavEvent::LinkClicked(href) => (Some(href.trim_start_matches('#').to_string()), true),
            NavEvent::ControlClicked(control) => (
                self.controls.iter().find(|(id, _)| id == control).map(|(_, target)| target.clone()),
                true,
            ),
            NavEvent::PopState => (history.fragment(), false),
        };
        let Some(target) = target.filter(|t| self.is_section(t)) else {
            tracing::debug!(?event, "ignoring navigation to unknown section");
            return false;
        };
        self.apply(doc, &target);
        if push {
            history.push(&target);
        }
        true
    }

    fn apply<D: Document + ?Sized>(&mut self, doc: &mut D, target: &str) {
        for section in doc.elements_by_class("section") {
            let on = doc.attr(section, "id").as_deref() == Some(target);
            doc.toggle_class(section, ACTIVE, on);
        }
        let href = format!("#{target}");
        for link in nav_links(doc) {
            let on = doc.attr(link, "href").as_deref() == Some(href.as_str());
            doc.toggle_class(link, ACTIVE, on);
        }
        if let Some(section) = doc.element_by_id(target) {
            doc.scroll_into_view(section);
        }
        self.active = Some(target.to_string());
    }
}

/// Anchor elements inside the `.sidebar` navigation.
pub fn nav_links<D: Document + ?Sized>(doc: &D) -> Vec<NodeId> {
    doc.elements_by_class("sidebar")
        .into_iter()
        .flat_map(|sidebar| doc.descendants(sidebar))
        .filter(|&n| doc.tag(n) == Some("a"))
        .collect()
}
