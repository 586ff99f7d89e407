use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use driving_scheduler::{
    config::{DatabaseConfig, EnvironmentConfig},
    repositories::{MemoryScheduleStore, PgScheduleStore, ScheduleStore},
    routes::create_router,
    rules::RuleRegistry,
    services::{DistanceProvider, LogNotifier, MapboxDistanceService},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,driving_scheduler=debug")),
        )
        .init();

    info!("🚗 Driving School Scheduler");
    info!("================================================");

    let config = EnvironmentConfig::from_env();

    let store: Arc<dyn ScheduleStore> = match DatabaseConfig::from_env() {
        Some(db_config) => {
            let pool = db_config.create_pool().await.map_err(|e| {
                error!("❌ Error conectando a la base de datos: {}", e);
                anyhow::anyhow!("Error de base de datos: {}", e)
            })?;
            DatabaseConfig::migrate(&pool).await?;
            info!("✅ PostgreSQL conectado y migrado");
            Arc::new(PgScheduleStore::new(pool))
        }
        None => {
            warn!("⚠️ DATABASE_URL no definido: usando almacén en memoria");
            Arc::new(MemoryScheduleStore::new())
        }
    };

    let distances: Option<Arc<dyn DistanceProvider>> = match &config.mapbox_token {
        Some(token) => {
            let service = MapboxDistanceService::new(token.clone(), config.scheduling.distance_timeout)?;
            Some(Arc::new(service))
        }
        None => None,
    };
    let rules = RuleRegistry::standard(&config.scheduling, distances);
    info!("📏 Reglas activas: {:?}", rules.names());

    let addr: SocketAddr = config.server_url().parse()?;
    let app = create_router(AppState::new(store, config, rules, Arc::new(LogNotifier)));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("👩‍🏫 Endpoints - Teacher:");
    info!("   POST /api/teacher/:teacher_id/available_hours - Horas disponibles");
    info!("   GET  /api/teacher/work_days - Horario del profesor");
    info!("   POST /api/teacher/work_days - Sustituir horario de un día");
    info!("   DELETE /api/teacher/work_days/:id - Eliminar bloque de horario");
    info!("📅 Endpoints - Appointments:");
    info!("   GET  /api/appointments - Listar citas");
    info!("   POST /api/appointments - Crear cita");
    info!("   GET  /api/appointments/:id - Obtener cita");
    info!("   POST /api/appointments/:id - Editar cita");
    info!("   DELETE /api/appointments/:id - Eliminar cita");
    info!("   POST /api/appointments/:id/approve - Aprobar cita");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo escuchar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo escuchar SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
