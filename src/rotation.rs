use crate::dom::Document;

pub const MAIN_IMAGE_ID: &str = "mainImage";

pub fn default_rotation() -> Vec<String> {
    ["imagem/showcase.png", "imagem/showcase-2.png", "imagem/showcase-3.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Cycles the hero image through a fixed list of sources.
#[derive(Debug, Clone)]
pub struct ImageRotator {
    images: Vec<String>,
    index: usize,
}

impl ImageRotator {
    pub fn new(images: Vec<String>) -> Self {
        Self { images, index: 0 }
    }

    pub fn current(&self) -> Option<&str> {
        self.images.get(self.index).map(String::as_str)
    }

    /// Show the next image. No-op when the page has no `mainImage` or the list is empty.
    pub fn advance<D: Document + ?Sized>(&mut self, doc: &mut D) -> Option<&str> {
        if self.images.is_empty() {
            return None;
        }
        let el = doc.element_by_id(MAIN_IMAGE_ID)?;
        self.index = (self.index + 1) % self.images.len();
        let src = &self.images[self.index];
        doc.set_attr(el, "src", src);
        Some(src)
    }
}
