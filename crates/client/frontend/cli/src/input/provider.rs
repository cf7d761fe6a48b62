use async_trait::async_trait;
use battle_core::MoveRef;
use runtime::{MoveProvider, MoveRequest, RuntimeError};
use tokio::sync::{mpsc, oneshot};

/// A pending move choice waiting for the player.
pub struct MovePrompt {
    pub request: MoveRequest,
    reply: oneshot::Sender<MoveRef>,
}

impl MovePrompt {
    /// Answers the prompt. Returns false if the synchronizer stopped waiting.
    pub fn answer(self, mv: MoveRef) -> bool {
        self.reply.send(mv).is_ok()
    }
}

/// Move provider that forwards each request to the console and waits for
/// the player's choice.
pub struct PromptMoveProvider {
    prompt_tx: mpsc::Sender<MovePrompt>,
}

impl PromptMoveProvider {
    /// Returns the provider and the receiving end the console reads prompts from.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<MovePrompt>) {
        let (prompt_tx, prompt_rx) = mpsc::channel(buffer.max(1));
        (Self { prompt_tx }, prompt_rx)
    }
}

#[async_trait]
impl MoveProvider for PromptMoveProvider {
    async fn select_move(&self, request: &MoveRequest) -> runtime::Result<MoveRef> {
        let (reply, answer) = oneshot::channel();
        let prompt = MovePrompt {
            request: request.clone(),
            reply,
        };

        self.prompt_tx
            .send(prompt)
            .await
            .map_err(|_| RuntimeError::ProviderClosed)?;

        match answer.await {
            Ok(mv) => Ok(mv),
            Err(_) => {
                tracing::debug!(match_id = %request.match_id, "Move prompt dismissed");
                Err(RuntimeError::ProviderClosed)
            }
        }
    }
}
