//! Injection engine: the [`Injector`] capability and [`TeraInjector`].
//!
//! # Text detection
//!
//! | Check                       | Result                              |
//! |-----------------------------|-------------------------------------|
//! | known text extension        | text                                |
//! | first 8 KiB contain a NUL   | binary                              |
//! | first 8 KiB are UTF-8       | text (a cut final code point is ok) |
//! | otherwise                   | binary                              |

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tera::Tera;

use forge_core::Variables;

use crate::context::TemplateContext;
use crate::error::{io_err, RenderError};

const SNIFF_LEN: usize = 8 * 1024;

const TEMPLATE_NAME: &str = "__forge_template";

/// Upper bound on undefined variables filled in for one template.
const MAX_FILLED: usize = 256;

const TEXT_EXTENSIONS: &[&str] = &[
    "bash", "bat", "c", "cfg", "cjs", "conf", "cpp", "cs", "css", "csv", "env", "go", "h",
    "hbs", "hpp", "htm", "html", "ini", "java", "js", "json", "jsx", "kt", "liquid", "md",
    "markdown", "mjs", "php", "properties", "ps1", "py", "rb", "rs", "scss", "sh", "sql",
    "svg", "swift", "tera", "toml", "ts", "tsx", "txt", "vue", "xml", "yaml", "yml", "zsh",
];

// ---------------------------------------------------------------------------
// Injector
// ---------------------------------------------------------------------------

/// Content injection capability used by the staging layer.
///
/// `inject` has a default implementation in terms of [`Injector::injection`],
/// so alternate renderers usually only provide the two decision/render hooks.
pub trait Injector: Send + Sync {
    /// Whether `src` should be rendered (`true`) or copied byte for byte.
    fn should_inject(
        &self,
        src: &Path,
        target: &Path,
        variables: &Variables,
    ) -> Result<bool, RenderError>;

    /// Render `content` in memory.
    fn injection(&self, content: &str, variables: &Variables) -> Result<String, RenderError>;

    /// Render `src` and write the result to `target`. Content that is not
    /// UTF-8 is copied byte for byte.
    fn inject(&self, src: &Path, target: &Path, variables: &Variables) -> Result<(), RenderError> {
        let bytes = std::fs::read(src).map_err(|e| io_err(src, e))?;
        let output = match String::from_utf8(bytes) {
            Ok(content) => self.injection(&content, variables)?.into_bytes(),
            Err(e) => {
                tracing::debug!(path = %src.display(), "template is not UTF-8, copying verbatim");
                e.into_bytes()
            }
        };
        std::fs::write(target, output).map_err(|e| io_err(target, e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TeraInjector
// ---------------------------------------------------------------------------

/// Tera-backed injector. Autoescaping is off: generated files are source
/// code, not HTML.
#[derive(Debug, Clone, Default)]
pub struct TeraInjector {
    _private: (),
}

impl TeraInjector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Injector for TeraInjector {
    fn should_inject(
        &self,
        src: &Path,
        _target: &Path,
        _variables: &Variables,
    ) -> Result<bool, RenderError> {
        is_text_file(src)
    }

    /// Undefined variables render as empty text: each one Tera reports is
    /// added to the context as `""` and the template is rendered again.
    fn injection(&self, content: &str, variables: &Variables) -> Result<String, RenderError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_template(TEMPLATE_NAME, content)?;

        let mut ctx = TemplateContext::from_variables(variables).to_tera_context()?;
        let mut filled: Vec<String> = Vec::new();
        loop {
            let err = match tera.render(TEMPLATE_NAME, &ctx) {
                Ok(rendered) => return Ok(rendered),
                Err(e) => e,
            };
            let name = match missing_variable(&err) {
                Some(name) if !filled.contains(&name) && filled.len() < MAX_FILLED => name,
                _ => return Err(err.into()),
            };
            tracing::debug!(variable = %name, "undefined template variable renders empty");
            fill_empty(&mut ctx, &name);
            filled.push(name);
        }
    }
}

/// Name of the variable behind a Tera "not found in context" error.
fn missing_variable(err: &tera::Error) -> Option<String> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        let msg = e.to_string();
        if let Some((name, tail)) = msg
            .strip_prefix("Variable `")
            .and_then(|rest| rest.split_once('`'))
        {
            if tail.starts_with(" not found in context") {
                return Some(name.to_string());
            }
        }
        current = e.source();
    }
    None
}

/// Insert `""` at a dotted path, creating intermediate objects.
fn fill_empty(ctx: &mut tera::Context, name: &str) {
    let mut segments = name.split('.');
    let Some(root) = segments.next() else {
        return;
    };
    let rest: Vec<&str> = segments.collect();
    let mut value = ctx.get(root).cloned().unwrap_or(tera::Value::Null);
    set_empty(&mut value, &rest);
    ctx.insert(root, &value);
}

fn set_empty(slot: &mut tera::Value, path: &[&str]) {
    match path.split_first() {
        None => {
            if slot.is_null() {
                *slot = tera::Value::String(String::new());
            }
        }
        Some((head, tail)) => {
            if slot.is_null() {
                *slot = tera::Value::Object(tera::Map::new());
            }
            if let tera::Value::Object(map) = slot {
                let child = map.entry(head.to_string()).or_insert(tera::Value::Null);
                set_empty(child, tail);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Text detection
// ---------------------------------------------------------------------------

/// Extension check first, then sniff the head of the file.
pub fn is_text_file(path: &Path) -> Result<bool, RenderError> {
    if has_text_extension(path) {
        return Ok(true);
    }

    let file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .map_err(|e| io_err(path, e))?;

    let text = looks_like_text(&head);
    tracing::trace!(path = %path.display(), text, "sniffed file content");
    Ok(text)
}

fn has_text_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            TEXT_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn looks_like_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // `error_len() == None` means the input ended mid code point, which
        // happens when the sniff window cuts a multi-byte character.
        Err(e) => e.error_len().is_none(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
