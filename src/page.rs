//! Static markup the portfolio mounts into.

use crate::types::{Category, DEFAULT_PROFILE};
use crate::view::Element;

pub const LOADER_ID: &str = "app-loader";
pub const YEAR_ID: &str = "current-year";

/// Sidebar entries: section id and link label, in display order.
pub const SECTIONS: [(&str, &str); 5] = [
    ("home", "Home"),
    ("projects", "Games"),
    ("my-projects", "Projects"),
    ("animations", "Animations"),
    ("worked", "Worked With"),
];

fn section_container(section: &str) -> Option<Category> {
    match section {
        "projects" => Some(Category::Games),
        "my-projects" => Some(Category::Projects),
        "animations" => Some(Category::Animations),
        "worked" => Some(Category::Groups),
        _ => None,
    }
}

/// The whole page with empty card containers. The loader is visible and the
/// content hidden until startup finishes.
pub fn skeleton(rotation: &[String]) -> Element {
    let nav = SECTIONS.iter().fold(Element::new("nav"), |nav, (id, label)| {
        let link = Element::new("a").attr("href", format!("#{id}")).text(*label);
        nav.child(if *id == "home" { link.class("active") } else { link })
    });
    let sidebar = Element::new("aside")
        .class("sidebar")
        .child(Element::new("img").class("profile-img").attr("src", DEFAULT_PROFILE).attr("alt", "Profile"))
        .child(nav);

    let mut content = Element::new("main").class("content").child(home(rotation));
    for (id, label) in &SECTIONS[1..] {
        let mut section = Element::new("section").id(id).class("section").child(Element::new("h2").text(*label));
        if let Some(category) = section_container(id) {
            section = section.child(Element::new("div").id(category.container_id()).class("projects-grid"));
        }
        content = content.child(section);
    }

    let footer = Element::new("footer").child(
        Element::new("p")
            .text("\u{a9} ")
            .child(Element::new("span").id(YEAR_ID))
            .child(Element::new("span").text(" Portfolio")),
    );
    let loader = Element::new("div")
        .id(LOADER_ID)
        .class("app-loader")
        .child(Element::new("div").class("spinner"))
        .child(Element::new("p").text("Loading portfolio..."));
    let container = Element::new("div")
        .class("container")
        .attr("style", "display:none")
        .child(sidebar)
        .child(content)
        .child(footer);
    let head = Element::new("head")
        .child(Element::new("meta").attr("charset", "utf-8"))
        .child(Element::new("title").text("Portfolio"));

    Element::new("html")
        .attr("lang", "en")
        .child(head)
        .child(Element::new("body").child(loader).child(container))
}

fn home(rotation: &[String]) -> Element {
    let hero = rotation.first().map(String::as_str).unwrap_or(DEFAULT_PROFILE);
    Element::new("section")
        .id("home")
        .class("section active")
        .child(Element::new("img").id(crate::rotation::MAIN_IMAGE_ID).attr("src", hero).attr("alt", "Showcase"))
        .child(Element::new("button").id("viewAnimationsBtn").class("btn").text("View Animations"))
}
