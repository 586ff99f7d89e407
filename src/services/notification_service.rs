//! Servicio de notificaciones
//!
//! Aviso a la otra parte de una cita. La entrega no está garantizada: un
//! fallo se registra y se ignora.

use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: Uuid, title: &str, body: &str) -> anyhow::Result<()>;
}

/// Escribe las notificaciones en el log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: Uuid, title: &str, body: &str) -> anyhow::Result<()> {
        log::info!("🔔 [{}] {}: {}", user_id, title, body);
        Ok(())
    }
}

/// Envía y se traga el error
pub async fn notify_quietly(notifier: &dyn Notifier, user_id: Uuid, title: &str, body: &str) {
    if let Err(e) = notifier.notify(user_id, title, body).await {
        log::warn!("⚠️ No se pudo notificar a {}: {}", user_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        async fn notify(&self, _: Uuid, _: &str, _: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("no token"))
        }
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        notify_quietly(&Failing, Uuid::new_v4(), "New Lesson!", "body").await;
        notify_quietly(&LogNotifier, Uuid::new_v4(), "New Lesson!", "body").await;
    }
}
