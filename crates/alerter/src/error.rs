use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlerterError {
    #[error("Notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{service} returned an error: {message}")]
    ApiError { service: &'static str, message: String },

    #[error("{0} of the configured notifiers failed")]
    Partial(usize),
}
