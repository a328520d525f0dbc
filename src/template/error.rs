use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template/parse: {0}")]
    Parse(#[from] handlebars::TemplateError),

    #[error("template/render: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("template/path-traversal: '{0}' escapes the project root")]
    PathTraversal(String),

    #[error("template/io: {0}")]
    Io(#[from] std::io::Error),
}
