//! Template context: serializable rendering payload built from [`Variables`].

use serde::Serialize;

use forge_core::Variables;

use crate::error::RenderError;

/// Key under which run metadata is exposed, unless a variable already uses it.
pub const META_KEY: &str = "forge";

/// Rendering payload: the run's variables plus a small metadata block.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    #[serde(flatten)]
    pub variables: Variables,
    #[serde(rename = "forge", skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaCtx>,
}

/// Metadata available to every template as `{{ forge.version }}`.
#[derive(Debug, Clone, Serialize)]
pub struct MetaCtx {
    pub version: String,
}

impl TemplateContext {
    /// Build a context from `variables`. The metadata block is dropped when a
    /// variable named [`META_KEY`] would be shadowed.
    pub fn from_variables(variables: &Variables) -> Self {
        let meta = (!variables.contains_key(META_KEY)).then(|| MetaCtx {
            version: env!("CARGO_PKG_VERSION").to_string(),
        });
        TemplateContext {
            variables: variables.clone(),
            meta,
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}
