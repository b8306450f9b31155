use notifly_common::NotiflyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InboxError {
    /// A history or mutation call to the notifications API failed
    #[error("Notifications API error: {0}")]
    Api(#[from] NotiflyError),
}

impl From<reqwest::Error> for InboxError {
    fn from(err: reqwest::Error) -> Self {
        InboxError::Api(err.into())
    }
}
