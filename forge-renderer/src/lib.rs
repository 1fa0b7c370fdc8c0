//! # forge-renderer
//!
//! Templating collaborator for the staging engine. [`Injector`] is the
//! capability the staging layer calls into ("should this file be rendered?",
//! "render it"); [`TeraInjector`] is the default tera-backed implementation.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use forge_core::{Value, Variables};
//! use forge_renderer::{Injector, TeraInjector};
//!
//! fn render(src: &Path, dest: &Path) -> Result<(), forge_renderer::RenderError> {
//!     let injector = TeraInjector::new();
//!     let mut vars = Variables::new();
//!     vars.insert("name".into(), Value::from("demo"));
//!     if injector.should_inject(src, dest, &vars)? {
//!         injector.inject(src, dest, &vars)?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::TemplateContext;
pub use engine::{is_text_file, Injector, TeraInjector};
pub use error::RenderError;
