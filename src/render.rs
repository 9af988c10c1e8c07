//! Entity lists to card view trees, plus the adapter step that mounts them.

use crate::dom::Document;
use crate::types::{Animation, Catalog, Category, GenericProject, Project, WorkedGroup, DEFAULT_IMAGE};
use crate::view::{Element, Node};

/// Value every stat placeholder starts at before a poller overwrites it.
pub const STAT_DEFAULT: &str = "0";

/// Anything the renderer can turn into a card.
pub trait Card {
    const CATEGORY: Category;

    fn card(&self) -> Node;
}

/// One card per item, or a single "no data" placeholder when the list is empty or absent.
pub fn render_cards<T: Card>(items: Option<&[T]>) -> Vec<Node> {
    match items {
        Some(items) if !items.is_empty() => items.iter().map(Card::card).collect(),
        _ => vec![empty_placeholder(T::CATEGORY)],
    }
}

pub fn empty_placeholder(category: Category) -> Node {
    Element::new("p").class("no-projects").text(category.empty_message()).into()
}

impl Catalog {
    pub fn render(&self) -> Vec<Node> {
        match self {
            Catalog::Games(items) => render_cards(Some(items.as_slice())),
            Catalog::Projects(items) => render_cards(Some(items.as_slice())),
            Catalog::Animations(items) => render_cards(Some(items.as_slice())),
            Catalog::Groups(items) => render_cards(Some(items.as_slice())),
        }
    }
}

/// Replace the category container's children with freshly rendered cards.
/// Returns `false` when the page has no container for this category.
pub fn mount<D: Document + ?Sized>(doc: &mut D, catalog: &Catalog) -> bool {
    let category = catalog.category();
    let Some(container) = doc.element_by_id(category.container_id()) else {
        tracing::debug!(?category, "no container on page; skipping render");
        return false;
    };
    doc.replace_children(container, &catalog.render());
    tracing::debug!(?category, cards = catalog.len(), "rendered cards");
    true
}

/// A stat block: numeric value (addressed by `id`) above a label.
pub fn stat(label: &str, id: &str) -> Element {
    Element::new("div")
        .class("stat")
        .child(Element::new("span").class("stat-value").id(id).text(STAT_DEFAULT))
        .child(Element::new("span").class("stat-label").text(label))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Image with a deferred source; the lazy loader assigns `src` later.
fn lazy_image(image: &Option<String>, alt: &str) -> Element {
    Element::new("img")
        .attr("data-src", non_empty(image).unwrap_or(DEFAULT_IMAGE))
        .attr("data-fallback", DEFAULT_IMAGE)
        .attr("alt", alt)
}

struct CardParts<'a> {
    kind: &'a str,
    href: Option<&'a str>,
    title: String,
    badge: Option<&'a str>,
    stats: Option<Element>,
    image: Element,
}

fn card(parts: CardParts<'_>, card_class: &str) -> Node {
    let mut header = Element::new("div")
        .class(&format!("{}-header", parts.kind))
        .child(Element::new("h3").text(parts.title));
    if let Some(badge) = parts.badge {
        header = header.child(Element::new("span").class(&format!("{}-badge", parts.kind)).text(badge));
    }

    let mut link = Element::new("a")
        .attr("href", parts.href.unwrap_or("#"))
        .attr("target", "_blank")
        .child(header);
    if let Some(stats) = parts.stats {
        link = link.child(stats);
    }
    link = link.child(Element::new("div").class(&format!("{}-image", parts.kind)).child(parts.image));

    Element::new("div").class(card_class).child(link).into()
}

impl Card for Project {
    const CATEGORY: Category = Category::Games;

    fn card(&self) -> Node {
        let id = non_empty(&self.universe_id).unwrap_or(STAT_DEFAULT);
        let title = non_empty(&self.game_title);
        let stats = Element::new("div")
            .class("game-stats")
            .child(stat("Playing", &format!("playing-{id}")))
            .child(stat("Visits", &format!("visits-{id}")));
        card(
            CardParts {
                kind: "game",
                href: non_empty(&self.game_url),
                title: title.unwrap_or(Self::CATEGORY.untitled()).to_string(),
                badge: Some("Roblox"),
                stats: Some(stats),
                image: lazy_image(&self.image, title.unwrap_or("Project image")),
            },
            "game-card",
        )
    }
}

impl Card for GenericProject {
    const CATEGORY: Category = Category::Projects;

    fn card(&self) -> Node {
        let title = non_empty(&self.title);
        card(
            CardParts {
                kind: "project",
                href: non_empty(&self.url),
                title: title.unwrap_or(Self::CATEGORY.untitled()).to_string(),
                badge: None,
                stats: None,
                image: lazy_image(&self.image, title.unwrap_or("Project image")),
            },
            "project-card",
        )
    }
}

impl Card for Animation {
    const CATEGORY: Category = Category::Animations;

    fn card(&self) -> Node {
        let title = non_empty(&self.title);
        card(
            CardParts {
                kind: "animation",
                href: non_empty(&self.url),
                title: title.unwrap_or(Self::CATEGORY.untitled()).to_string(),
                badge: None,
                stats: None,
                image: lazy_image(&self.image, title.unwrap_or("Animation image")),
            },
            "animation-card",
        )
    }
}

impl Card for WorkedGroup {
    const CATEGORY: Category = Category::Groups;

    fn card(&self) -> Node {
        let id = non_empty(&self.group_id).unwrap_or(STAT_DEFAULT);
        let title = non_empty(&self.group_title);
        let stats = Element::new("div").class("group-stats").child(stat("Members", &format!("memberCount-{id}")));
        card(
            CardParts {
                kind: "group",
                href: non_empty(&self.group_url),
                title: title.unwrap_or(Self::CATEGORY.untitled()).to_string(),
                badge: Some("Group"),
                stats: Some(stats),
                image: lazy_image(&self.image, title.unwrap_or("Group image")),
            },
            "worked-group",
        )
    }
}
