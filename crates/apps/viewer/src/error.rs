use catalog::RemoteError;
use formats::FormatError;
use layers::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl ViewerError {
    /// Text shown to the user for a failed operation.
    pub fn user_message(&self) -> String {
        match self {
            ViewerError::Format(e) => format!("Error processing file: {e}"),
            ViewerError::Store(StoreError::SystemLayerProtected(_)) => {
                "System layers cannot be removed.".to_string()
            }
            ViewerError::Store(e) => e.to_string(),
            ViewerError::Remote(e) => e.user_message(),
        }
    }
}
