//! Sample entities rendered when no document store is configured. Already
//! filtered to visible items.

use crate::types::{Animation, Catalog, GenericProject, Project, WorkedGroup};

pub fn projects() -> Vec<Project> {
    vec![
        Project {
            id: None,
            universe_id: Some("1234567".into()),
            game_title: Some("Example Game A".into()),
            game_url: Some("https://www.roblox.com/games/1234567/example-a".into()),
            image: Some("imagem/sample-game-a.jpg".into()),
            show: true,
        },
        Project {
            id: None,
            universe_id: Some("2345678".into()),
            game_title: Some("Example Game B".into()),
            game_url: Some("https://www.roblox.com/games/2345678/example-b".into()),
            image: Some("imagem/sample-game-b.jpg".into()),
            show: true,
        },
    ]
}

pub fn animations() -> Vec<Animation> {
    vec![
        Animation {
            id: None,
            title: Some("Fortnite dance".into()),
            image: Some("imagem/sample-anim-1.jpg".into()),
            url: Some("#".into()),
        },
        Animation {
            id: None,
            title: Some("Mutation Anims".into()),
            image: Some("imagem/sample-anim-2.jpg".into()),
            url: Some("#".into()),
        },
    ]
}

pub fn my_projects() -> Vec<GenericProject> {
    vec![GenericProject {
        id: None,
        title: Some("Echoes Of Battle (LOGO)".into()),
        url: None,
        image: Some("imagem/sample-project-1.jpg".into()),
        show: true,
    }]
}

pub fn worked() -> Vec<WorkedGroup> {
    vec![WorkedGroup {
        id: None,
        group_id: Some("112233".into()),
        group_title: Some("Exército BR (Demo)".into()),
        group_url: None,
        image: Some("imagem/sample-group.jpg".into()),
        show: true,
    }]
}

/// Every fixture, in the order the page renders them.
pub fn catalogs() -> Vec<Catalog> {
    vec![
        Catalog::Games(projects()),
        Catalog::Animations(animations()),
        Catalog::Projects(my_projects()),
        Catalog::Groups(worked()),
    ]
}
