use crate::cli::actions::{bootstrap, Action};
use anyhow::Result;

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Bootstrap(args) => bootstrap::execute(args).await,
    }
}
