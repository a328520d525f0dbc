//! Template Engine (§4.2): pure, side-effect-free rendering of provider
//! parameter templates against the same scope the Expression Sandbox sees.

mod engine;
mod error;
mod filters;

pub use engine::TemplateEngine;
pub use error::TemplateError;
