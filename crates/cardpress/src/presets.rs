//! Files bundled into the binary for scaffolding and the overview page.
//!
//! Every preset is a path relative to the project root plus its contents.
//! Card-type starters have no fixed name; [`card_type_files`] names them
//! after the requested type.

/// A file written by the scaffolding commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub path: &'static str,
    pub contents: &'static str,
}

/// Template for the page listing every produced batch.
pub const OVERVIEW: &str = include_str!("../presets/overview.html");

/// Files of a fresh, empty project.
pub const PROJECT: &[Preset] = &[
    Preset {
        path: "targets/global.css",
        contents: include_str!("../presets/project/global.css"),
    },
    Preset {
        path: "targets/default.html",
        contents: include_str!("../presets/project/default.html"),
    },
    Preset {
        path: "targets/sprite.html",
        contents: include_str!("../presets/project/sprite.html"),
    },
    Preset {
        path: "scripts/fit-text.js",
        contents: include_str!("../presets/project/fit-text.js"),
    },
];

/// Extra files of the example project, written on top of [`PROJECT`].
pub const EXAMPLE: &[Preset] = &[
    Preset {
        path: "cards/actions.html",
        contents: include_str!("../presets/example/actions.html"),
    },
    Preset {
        path: "cards/actions.csv",
        contents: include_str!("../presets/example/actions.csv"),
    },
    Preset {
        path: "cards/actions.css",
        contents: include_str!("../presets/example/actions.css"),
    },
    Preset {
        path: "cards/buildings.html",
        contents: include_str!("../presets/example/buildings.html"),
    },
    Preset {
        path: "cards/buildings.csv",
        contents: include_str!("../presets/example/buildings.csv"),
    },
    Preset {
        path: "cards/buildings.css",
        contents: include_str!("../presets/example/buildings.css"),
    },
    Preset {
        path: "images/strong.svg",
        contents: include_str!("../presets/example/strong.svg"),
    },
    Preset {
        path: "icons/tap.svg",
        contents: include_str!("../presets/example/tap.svg"),
    },
];

/// Starter files for a new card type, by extension.
const CARD_TYPE: &[(&str, &str)] = &[
    ("html", include_str!("../presets/card-type/card.html")),
    ("csv", include_str!("../presets/card-type/card.csv")),
    ("css", include_str!("../presets/card-type/card.css")),
];

/// The starter files for card type `name`, as `(file name, contents)`.
pub fn card_type_files(name: &str) -> Vec<(String, &'static str)> {
    CARD_TYPE
        .iter()
        .map(|(ext, contents)| (format!("{name}.{ext}"), *contents))
        .collect()
}
