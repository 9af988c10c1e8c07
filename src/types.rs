use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Asset shown when a card has no image or its image fails to load.
pub const DEFAULT_IMAGE: &str = "imagem/default-project.png";
/// Asset substituted for broken `.profile-img` images.
pub const DEFAULT_PROFILE: &str = "imagem/default-profile.png";

/// A showcased game, keyed by its external universe id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub universe_id: Option<String>,
    #[serde(default)]
    pub game_title: Option<String>,
    #[serde(default)]
    pub game_url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub show: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericProject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "gameUrl")]
    pub url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub show: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A group the portfolio owner has worked with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkedGroup {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub group_title: Option<String>,
    #[serde(default)]
    pub group_url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub show: bool,
}

// External ids are string-encoded numbers, but stores happily hand back raw numbers.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// The four kinds of card the page displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Games,
    Projects,
    Animations,
    Groups,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::Games, Category::Projects, Category::Animations, Category::Groups];

    /// Id of the element whose children hold this category's cards.
    pub fn container_id(self) -> &'static str {
        match self {
            Category::Games => "projectsContainer",
            Category::Projects => "myProjectsContainer",
            Category::Animations => "animationsContainer",
            Category::Groups => "workedContainer",
        }
    }

    pub fn empty_message(self) -> &'static str {
        match self {
            Category::Games | Category::Projects => "No projects available at this time.",
            Category::Animations => "No animations available at this time.",
            Category::Groups => "No groups available at this time.",
        }
    }

    pub fn untitled(self) -> &'static str {
        match self {
            Category::Games => "Untitled Project",
            Category::Projects => "Untitled",
            Category::Animations => "Untitled Animation",
            Category::Groups => "Untitled Group",
        }
    }
}

/// Named collections in the remote document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    #[serde(rename = "projects")]
    Projects,
    #[serde(rename = "animations")]
    Animations,
    #[serde(rename = "myProjects")]
    MyProjects,
    #[serde(rename = "worked")]
    Worked,
}

impl Collection {
    pub const ALL: [Collection; 4] = [Collection::Projects, Collection::Animations, Collection::MyProjects, Collection::Worked];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Projects => "projects",
            Collection::Animations => "animations",
            Collection::MyProjects => "myProjects",
            Collection::Worked => "worked",
        }
    }

    pub fn category(self) -> Category {
        match self {
            Collection::Projects => Category::Games,
            Collection::Animations => Category::Animations,
            Collection::MyProjects => Category::Projects,
            Collection::Worked => Category::Groups,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed snapshot of one category, in delivery order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", content = "items", rename_all = "lowercase")]
pub enum Catalog {
    Games(Vec<Project>),
    Projects(Vec<GenericProject>),
    Animations(Vec<Animation>),
    Groups(Vec<WorkedGroup>),
}

impl Catalog {
    pub fn category(&self) -> Category {
        match self {
            Catalog::Games(_) => Category::Games,
            Catalog::Projects(_) => Category::Projects,
            Catalog::Animations(_) => Category::Animations,
            Catalog::Groups(_) => Category::Groups,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Catalog::Games(v) => v.len(),
            Catalog::Projects(v) => v.len(),
            Catalog::Animations(v) => v.len(),
            Catalog::Groups(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode raw store documents for `collection`. Documents that do not fit
    /// the entity shape are dropped with a warning instead of failing the snapshot.
    pub fn decode(collection: Collection, documents: Vec<Value>) -> Catalog {
        match collection.category() {
            Category::Games => Catalog::Games(decode_all(collection, documents)),
            Category::Projects => Catalog::Projects(decode_all(collection, documents)),
            Category::Animations => Catalog::Animations(decode_all(collection, documents)),
            Category::Groups => Catalog::Groups(decode_all(collection, documents)),
        }
    }
}

fn decode_all<T: serde::de::DeserializeOwned>(collection: Collection, documents: Vec<Value>) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|doc| match serde_json::from_value(doc) {
            Ok(item) => Some(item),
            Err(err) => {
                tracing::warn!(%collection, error = %err, "skipping malformed document");
                None
            }
        })
        .collect()
}
