use async_trait::async_trait;

/// Asks the operator to confirm a destructive action.
///
/// Implementations show whatever dialog the host UI has and resolve to the
/// user's choice. A declined prompt is not an error.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// Prompt that always gives the same answer, for batch tools and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

#[async_trait]
impl ConfirmationPrompt for FixedAnswer {
    async fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}
