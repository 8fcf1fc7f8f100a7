use herald_core::MediatorError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    #[error("mediator: {0}")]
    Mediator(#[from] MediatorError),

    #[error("listener has no handlers: {listener}")]
    NoHandlers { listener: &'static str },
}

pub type ListenerResult<T> = Result<T, ListenerError>;
