use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use yolo_predict_api::{
    adapters::{
        http::{router, state::HttpState},
        onnx::{model_catalog::OnnxModelCatalog, yolo_engine::OnnxYoloEngine},
    },
    application::{ports::ModelCatalogPort, services::PredictionService},
    config::ServerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG manda; si no existe, info)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    // 2. Configuración desde flags y variables de entorno
    let config = ServerConfig::parse();
    config.validate()?;
    let infer = config.inference();

    // 3. Validar y cargar el modelo una sola vez para todo el proceso
    tracing::info!("🔧 Cargando detector desde {} ({})", infer.model.onnx_path, infer.device);
    OnnxModelCatalog::new().validate_model(&infer.model).await?;
    let engine = OnnxYoloEngine::load(&infer)?;

    // 4. Servicio de predicción inyectado en el estado de Axum
    let state = HttpState::new(PredictionService::new(Arc::new(engine)));
    let app = router(state, config.max_upload_bytes);

    // 5. Lanzar el servidor
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("no se pudo escuchar en {addr}"))?;
    tracing::info!("🚀 Servidor YOLO iniciado en http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("🛑 Servidor detenido");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("No se puede escuchar Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Apagado solicitado");
}
