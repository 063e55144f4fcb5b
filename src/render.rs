//! Listing renderers: tera templates for the HTML themes, direct
//! serialisation for `json` and `table`.
//!
//! A [`ListingRenderer`] is built once per server. Its compiled templates are
//! never touched again, so it is shared across requests without locking.

use serde::Serialize;
use tera::{Context, Tera};
use tracing::{info, warn};

use crate::error::{RenderError, StartupError};
use crate::listing::ListingPage;
use crate::theme::{self, Theme, ThemeKind};
use crate::web_assets;

/// Name of the layout every themed template extends.
pub const BASE_TEMPLATE: &str = "base.html";

/// URL prefix under which theme stylesheets and scripts are served.
pub const ASSET_PREFIX: &str = "/_servergo_assets";

/// Raw template sources the renderer compiles from.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    sources: Vec<(String, String)>,
}

impl TemplateSet {
    /// Templates compiled into the binary.
    pub fn embedded() -> Self {
        Self {
            sources: web_assets::TEMPLATES
                .iter()
                .map(|(name, src)| (name.to_string(), src.to_string()))
                .collect(),
        }
    }

    /// Add `name`, replacing any existing source with that name.
    #[cfg(test)]
    pub fn with_template(mut self, name: &str, source: &str) -> Self {
        self.sources.retain(|(n, _)| n != name);
        self.sources.push((name.to_string(), source.to_string()));
        self
    }

    #[cfg(test)]
    pub fn without_template(mut self, name: &str) -> Self {
        self.sources.retain(|(n, _)| n != name);
        self
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.sources
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, src)| src.as_str())
    }
}

pub struct ListingRenderer {
    theme: Theme,
    /// Present exactly when `theme` is templated.
    tera: Option<Tera>,
}

impl ListingRenderer {
    /// Resolve `requested` to a theme and compile what it needs.
    ///
    /// Unknown theme names and themes that fail to compile fall back to
    /// `default` with a warning. Failure to compile `default` is fatal.
    pub fn load(requested: &str, templates: &TemplateSet) -> Result<Self, StartupError> {
        if !theme::is_valid(requested) {
            warn!(theme = requested, fallback = theme::DEFAULT_THEME, "unknown theme");
        }
        let theme = theme::lookup(requested).unwrap_or_else(theme::default_theme);

        if theme.kind != ThemeKind::Templated {
            info!(theme = theme.name, "using structured listing theme");
            return Ok(Self { theme, tera: None });
        }

        match compile(&theme, templates) {
            Ok(tera) => Ok(Self {
                theme,
                tera: Some(tera),
            }),
            Err(e) if theme.name != theme::DEFAULT_THEME => {
                warn!(
                    theme = theme.name,
                    fallback = theme::DEFAULT_THEME,
                    error = %e,
                    "theme failed to load"
                );
                Self::load_default(templates)
            }
            Err(e) => Err(default_failed(e)),
        }
    }

    fn load_default(templates: &TemplateSet) -> Result<Self, StartupError> {
        let theme = theme::default_theme();
        let tera = compile(&theme, templates).map_err(default_failed)?;
        Ok(Self {
            theme,
            tera: Some(tera),
        })
    }

    /// The theme actually in use after any fallback.
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Render `page`, returning the body and its content type.
    pub fn render(&self, page: &ListingPage) -> Result<(String, &'static str), RenderError> {
        let body = match (self.theme.kind, &self.tera) {
            (ThemeKind::Json, _) => render_json(page)?,
            (ThemeKind::Table, _) => render_table(page),
            (ThemeKind::Templated, Some(tera)) => self.render_template(tera, page)?,
            (ThemeKind::Templated, None) => {
                return Err(self.template_error(tera::Error::msg("template set not compiled")))
            }
        };
        Ok((body, self.theme.content_type()))
    }

    fn render_template(&self, tera: &Tera, page: &ListingPage) -> Result<String, RenderError> {
        let mut context = Context::from_serialize(page).map_err(|e| self.template_error(e))?;
        context.insert("theme", self.theme.name);
        context.insert("asset_prefix", ASSET_PREFIX);
        tera.render(&template_name(&self.theme), &context)
            .map_err(|e| self.template_error(e))
    }

    fn template_error(&self, source: tera::Error) -> RenderError {
        RenderError::Template {
            theme: self.theme.name,
            template: template_name(&self.theme),
            source,
        }
    }
}

fn template_name(theme: &Theme) -> String {
    theme
        .template_name()
        .unwrap_or_else(|| theme.name.to_string())
}

fn default_failed(e: tera::Error) -> StartupError {
    StartupError::Configuration(format!(
        "default listing theme failed to load: {}",
        error_chain(&e)
    ))
}

/// Tera nests the useful parse message in `source()`.
fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut out = e.to_string();
    let mut next = e.source();
    while let Some(cause) = next {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        next = cause.source();
    }
    out
}

/// Compile the layout plus the theme's own template, nothing else, so one
/// broken theme cannot take the others down.
fn compile(theme: &Theme, templates: &TemplateSet) -> Result<Tera, tera::Error> {
    let name = template_name(theme);
    let base = templates
        .get(BASE_TEMPLATE)
        .ok_or_else(|| tera::Error::msg(format!("template '{BASE_TEMPLATE}' is missing")))?;
    let own = templates
        .get(&name)
        .ok_or_else(|| tera::Error::msg(format!("template '{name}' is missing")))?;

    let mut tera = Tera::default();
    tera.add_raw_templates(vec![(BASE_TEMPLATE, base), (name.as_str(), own)])?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// json
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct JsonListing<'a> {
    path: &'a str,
    timestamp: &'a str,
    parent_directory: &'a str,
    contents: Vec<JsonEntry<'a>>,
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    name: &'a str,
    is_directory: bool,
    size: u64,
    size_formatted: &'a str,
    last_modified: &'a str,
    path: &'a str,
    url: &'a str,
}

fn render_json(page: &ListingPage) -> Result<String, RenderError> {
    let listing = JsonListing {
        path: &page.dir_path,
        timestamp: &page.timestamp,
        parent_directory: &page.parent_dir,
        contents: page
            .entries
            .iter()
            .map(|e| JsonEntry {
                name: &e.name,
                is_directory: e.is_dir,
                size: e.size_bytes,
                size_formatted: &e.size,
                last_modified: &e.modified,
                path: &e.path,
                url: &e.url,
            })
            .collect(),
    };

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    listing.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf)?)
}

// ---------------------------------------------------------------------------
// table
// ---------------------------------------------------------------------------

const MIN_NAME_WIDTH: usize = 4;
const MIN_SIZE_WIDTH: usize = 4;
const MIN_TIME_WIDTH: usize = 8;
const TYPE_WIDTH: usize = 4;

/// Terminal cell width: ASCII is one cell, anything else is counted as two.
fn display_width(s: &str) -> usize {
    s.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

fn pad(s: &str, width: usize) -> String {
    let mut out = s.to_string();
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(display_width(s))));
    out
}

fn render_table(page: &ListingPage) -> String {
    let name_w = page
        .entries
        .iter()
        .map(|e| display_width(&e.name))
        .fold(MIN_NAME_WIDTH, usize::max);
    let size_w = page
        .entries
        .iter()
        .map(|e| display_width(&e.size))
        .fold(MIN_SIZE_WIDTH, usize::max);
    let time_w = page
        .entries
        .iter()
        .map(|e| display_width(&e.modified))
        .fold(MIN_TIME_WIDTH, usize::max);

    let row = |name: &str, size: &str, time: &str, kind: &str| {
        format!(
            "{}  {}  {}  {}\n",
            pad(name, name_w),
            pad(size, size_w),
            pad(time, time_w),
            kind
        )
    };

    let mut out = row("Name", "Size", "Modified", "Type");
    out.push_str(&format!(
        "{}  {}  {}  {}\n",
        "-".repeat(name_w),
        "-".repeat(size_w),
        "-".repeat(time_w),
        "-".repeat(TYPE_WIDTH)
    ));
    for entry in &page.entries {
        let kind = if entry.is_dir { "dir" } else { "file" };
        out.push_str(&row(&entry.name, &entry.size, &entry.modified, kind));
    }
    out
}
