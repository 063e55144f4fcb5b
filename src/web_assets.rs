//! Static resources compiled into the binary with `include_str!`, so a
//! single executable serves every theme and the login page.

/// Listing templates as `(name, source)`. Every theme template extends
/// `base.html`.
pub const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("templates/base.html")),
    ("default.html", include_str!("templates/default.html")),
    ("dark.html", include_str!("templates/dark.html")),
    ("blue.html", include_str!("templates/blue.html")),
    ("green.html", include_str!("templates/green.html")),
    ("retro.html", include_str!("templates/retro.html")),
    ("modern.html", include_str!("templates/modern.html")),
    ("material.html", include_str!("templates/material.html")),
    ("minimal.html", include_str!("templates/minimal.html")),
    ("glass.html", include_str!("templates/glass.html")),
    ("ocean.html", include_str!("templates/ocean.html")),
    ("forest.html", include_str!("templates/forest.html")),
    ("sunset.html", include_str!("templates/sunset.html")),
    ("autumn.html", include_str!("templates/autumn.html")),
    ("winter.html", include_str!("templates/winter.html")),
    ("spring.html", include_str!("templates/spring.html")),
    ("summer.html", include_str!("templates/summer.html")),
    ("cyberpunk.html", include_str!("templates/cyberpunk.html")),
    ("neon.html", include_str!("templates/neon.html")),
    ("matrix.html", include_str!("templates/matrix.html")),
    ("terminal.html", include_str!("templates/terminal.html")),
    ("space.html", include_str!("templates/space.html")),
    ("neon-blue.html", include_str!("templates/neon-blue.html")),
    ("neon-pink.html", include_str!("templates/neon-pink.html")),
    ("gradient.html", include_str!("templates/gradient.html")),
    ("monochrome.html", include_str!("templates/monochrome.html")),
    ("arctic.html", include_str!("templates/arctic.html")),
    ("desert.html", include_str!("templates/desert.html")),
    ("volcano.html", include_str!("templates/volcano.html")),
    ("galaxy.html", include_str!("templates/galaxy.html")),
    ("vintage.html", include_str!("templates/vintage.html")),
    ("corporate.html", include_str!("templates/corporate.html")),
    ("paper.html", include_str!("templates/paper.html")),
    ("bootstrap.html", include_str!("templates/bootstrap.html")),
    ("nature.html", include_str!("templates/nature.html")),
    ("technology.html", include_str!("templates/technology.html")),
    ("elegant.html", include_str!("templates/elegant.html")),
];

const THEME_CSS: &[(&str, &str)] = &[
    ("default", include_str!("assets/themes/default.css")),
    ("dark", include_str!("assets/themes/dark.css")),
    ("blue", include_str!("assets/themes/blue.css")),
    ("green", include_str!("assets/themes/green.css")),
    ("retro", include_str!("assets/themes/retro.css")),
    ("modern", include_str!("assets/themes/modern.css")),
    ("material", include_str!("assets/themes/material.css")),
    ("minimal", include_str!("assets/themes/minimal.css")),
    ("glass", include_str!("assets/themes/glass.css")),
    ("ocean", include_str!("assets/themes/ocean.css")),
    ("forest", include_str!("assets/themes/forest.css")),
    ("sunset", include_str!("assets/themes/sunset.css")),
    ("autumn", include_str!("assets/themes/autumn.css")),
    ("winter", include_str!("assets/themes/winter.css")),
    ("spring", include_str!("assets/themes/spring.css")),
    ("summer", include_str!("assets/themes/summer.css")),
    ("cyberpunk", include_str!("assets/themes/cyberpunk.css")),
    ("neon", include_str!("assets/themes/neon.css")),
    ("matrix", include_str!("assets/themes/matrix.css")),
    ("terminal", include_str!("assets/themes/terminal.css")),
    ("space", include_str!("assets/themes/space.css")),
    ("neon-blue", include_str!("assets/themes/neon-blue.css")),
    ("neon-pink", include_str!("assets/themes/neon-pink.css")),
    ("gradient", include_str!("assets/themes/gradient.css")),
    ("monochrome", include_str!("assets/themes/monochrome.css")),
    ("arctic", include_str!("assets/themes/arctic.css")),
    ("desert", include_str!("assets/themes/desert.css")),
    ("volcano", include_str!("assets/themes/volcano.css")),
    ("galaxy", include_str!("assets/themes/galaxy.css")),
    ("vintage", include_str!("assets/themes/vintage.css")),
    ("corporate", include_str!("assets/themes/corporate.css")),
    ("paper", include_str!("assets/themes/paper.css")),
    ("bootstrap", include_str!("assets/themes/bootstrap.css")),
    ("nature", include_str!("assets/themes/nature.css")),
    ("technology", include_str!("assets/themes/technology.css")),
    ("elegant", include_str!("assets/themes/elegant.css")),
];

/// Layout shared by every templated theme.
pub const LISTING_CSS: &str = include_str!("assets/listing.css");

/// Filtering and column sorting for listing pages.
pub const LISTING_JS: &str = include_str!("assets/listing.js");

pub const LOGIN_HTML: &str = include_str!("assets/login.html");
pub const LOGIN_CSS: &str = include_str!("assets/login.css");
pub const LOGIN_JS: &str = include_str!("assets/login.js");

/// Look up a listing asset by file name (`dark.css`, `listing.js`), returning
/// its body and content type.
pub fn listing_asset(name: &str) -> Option<(&'static str, &'static str)> {
    if name == "listing.js" {
        return Some((LISTING_JS, "text/javascript; charset=utf-8"));
    }
    if name == "listing.css" {
        return Some((LISTING_CSS, "text/css; charset=utf-8"));
    }
    let theme = name.strip_suffix(".css")?;
    THEME_CSS
        .iter()
        .find(|(t, _)| *t == theme)
        .map(|(_, css)| (*css, "text/css; charset=utf-8"))
}
