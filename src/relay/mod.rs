//! The streaming relay: translates one chat turn into a client-safe
//! frame stream. Provider and configuration failures become readable
//! Delta frames, and every stream ends with exactly one Done frame,
//! so a connected client is never left hanging on a raw error.

mod frame;
pub mod moderation;

pub use frame::{DONE_SENTINEL, Frame};

use std::time::Duration;

use tokio::sync::mpsc;

use crate::core::AppConfig;
use crate::openai::{CompletionError, Message, Role, completion_stream};
use moderation::Moderation;

pub const CONFIG_ERROR_MESSAGE: &str =
    "Config error: falta credenciales de OpenAI o Azure en el servidor.";

pub const CRISIS_MESSAGE: &str = "Lamento que estés pasando por un momento tan duro. No estás solo/a.\n\n\
Si corres riesgo inminente, llama a 911 o busca ayuda cercana.\n\n\
En México, Línea de la Vida (24/7): 800 911 2000.";

fn hint_for(err: &CompletionError) -> &'static str {
    match err {
        CompletionError::InvalidCredential => "API key inválida o sin permisos.",
        CompletionError::RateLimited => "Límite de uso alcanzado o billing pendiente.",
        CompletionError::Network(_) => "Error de red al contactar el servicio.",
        CompletionError::Upstream(_) => "Problema con el servicio.",
    }
}

/// Run one chat turn, writing the resulting frames to `tx`.
///
/// Holds no state between calls; the outcome is a pure function of
/// the history plus server-side configuration. Send failures are
/// ignored on purpose: a closed receiver means the client hung up
/// and the turn is simply abandoned.
pub async fn handle_chat_turn(
    tx: mpsc::UnboundedSender<Frame>,
    history: Vec<Message>,
    config: &AppConfig,
    moderation: &dyn Moderation,
) {
    run_turn(&tx, history, config, moderation).await;
    let _ = tx.send(Frame::Done);
}

async fn run_turn(
    tx: &mpsc::UnboundedSender<Frame>,
    history: Vec<Message>,
    config: &AppConfig,
    moderation: &dyn Moderation,
) {
    let Some(provider) = config.provider() else {
        let _ = tx.send(Frame::Delta(CONFIG_ERROR_MESSAGE.to_string()));
        return;
    };

    if history.is_empty() {
        return;
    }

    let latest_user = history
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("");

    match moderation.is_flagged(latest_user).await {
        Ok(true) => {
            let _ = tx.send(Frame::Delta(CRISIS_MESSAGE.to_string()));
            return;
        }
        Ok(false) => {}
        Err(e) => {
            tracing::warn!("Moderation check failed, continuing unflagged: {}", e);
        }
    }

    // Prepend the fixed system instruction; the caller's history is
    // copied through verbatim
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(Message::new(Role::System, &config.system_message));
    messages.extend(history);

    let (delta_tx, mut delta_rx) = mpsc::unbounded_channel::<String>();
    let forward_tx = tx.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(fragment) = delta_rx.recv().await {
            if forward_tx.send(Frame::Delta(fragment)).is_err() {
                break;
            }
        }
    });

    let result = completion_stream(
        delta_tx,
        &messages,
        &provider,
        Duration::from_secs(config.upstream_timeout_secs),
    )
    .await;

    // The sender side is dropped once the call returns, so this only
    // waits for already-received fragments to flush in order
    let _ = forwarder.await;

    if let Err(e) = result {
        tracing::error!("Chat turn failed: {}", e);
        let _ = tx.send(Frame::Delta(format!("Lo siento, {}", hint_for(&e))));
    }
}
