/// Hard failures of the compile stage
///
/// Malformed markup never ends up here; it is reported as a diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Markup(#[from] logipard_markup::MarkupError),

    #[error(transparent)]
    Model(#[from] logipard_fdom::FdomError),

    #[error("Model output is not open")]
    NotOpen,
}

pub type Result<T> = std::result::Result<T, CompileError>;
