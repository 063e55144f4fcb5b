//! The closed set of listing themes.

/// How a theme produces its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeKind {
    /// HTML from a compiled template.
    Templated,
    /// `application/json`, no template.
    Json,
    /// Aligned plain-text table, no template.
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub kind: ThemeKind,
}

pub const DEFAULT_THEME: &str = "default";

/// Listing order is also the order `themes` prints.
const THEMES: &[Theme] = &[
    Theme::templated("default"),
    Theme::templated("dark"),
    Theme::templated("blue"),
    Theme::templated("green"),
    Theme::templated("retro"),
    Theme {
        name: "json",
        kind: ThemeKind::Json,
    },
    Theme {
        name: "table",
        kind: ThemeKind::Table,
    },
    Theme::templated("modern"),
    Theme::templated("material"),
    Theme::templated("minimal"),
    Theme::templated("glass"),
    Theme::templated("ocean"),
    Theme::templated("forest"),
    Theme::templated("sunset"),
    Theme::templated("autumn"),
    Theme::templated("winter"),
    Theme::templated("spring"),
    Theme::templated("summer"),
    Theme::templated("cyberpunk"),
    Theme::templated("neon"),
    Theme::templated("matrix"),
    Theme::templated("terminal"),
    Theme::templated("space"),
    Theme::templated("neon-blue"),
    Theme::templated("neon-pink"),
    Theme::templated("gradient"),
    Theme::templated("monochrome"),
    Theme::templated("arctic"),
    Theme::templated("desert"),
    Theme::templated("volcano"),
    Theme::templated("galaxy"),
    Theme::templated("vintage"),
    Theme::templated("corporate"),
    Theme::templated("paper"),
    Theme::templated("bootstrap"),
    Theme::templated("nature"),
    Theme::templated("technology"),
    Theme::templated("elegant"),
];

impl Theme {
    const fn templated(name: &'static str) -> Self {
        Self {
            name,
            kind: ThemeKind::Templated,
        }
    }

    /// Template resource name inside the template set, e.g. `dark.html`.
    pub fn template_name(&self) -> Option<String> {
        (self.kind == ThemeKind::Templated).then(|| format!("{}.html", self.name))
    }

    pub fn content_type(&self) -> &'static str {
        match self.kind {
            ThemeKind::Templated => "text/html; charset=utf-8",
            ThemeKind::Json => "application/json",
            ThemeKind::Table => "text/plain; charset=utf-8",
        }
    }
}

/// Every valid theme name, in display order.
pub fn supported_themes() -> impl Iterator<Item = &'static str> {
    THEMES.iter().map(|t| t.name)
}

pub fn is_valid(name: &str) -> bool {
    lookup(name).is_some()
}

pub fn lookup(name: &str) -> Option<Theme> {
    THEMES.iter().copied().find(|t| t.name == name)
}

/// The built-in default theme.
pub fn default_theme() -> Theme {
    Theme::templated(DEFAULT_THEME)
}
