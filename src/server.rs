use crate::error::GatewayError;
use crate::gateway_state::GatewayState;
use crate::io_struct::GenerationResponse;
use actix_web::{HttpResponse, HttpServer, get, post, web};
use bytes::Bytes;
use std::io::Write;

pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_payload_size: usize,
}

#[get("/health")]
pub async fn health(_: web::Data<GatewayState>) -> HttpResponse {
    HttpResponse::Ok().body("Ok")
}

#[get("/")]
pub async fn list_models(
    app_state: web::Data<GatewayState>,
) -> Result<HttpResponse, GatewayError> {
    let models = app_state.list_models().await?;
    Ok(HttpResponse::Ok().json(models))
}

#[post("/generate")]
pub async fn generate(
    body: Result<Bytes, actix_web::Error>,
    app_state: web::Data<GatewayState>,
) -> Result<HttpResponse, GatewayError> {
    let body = body.map_err(|e| {
        log::warn!("Failed to read the request body: {}", e);
        GatewayError::Payload(e)
    })?;
    let response = app_state.generate(&body).await?;
    Ok(HttpResponse::Ok().json(GenerationResponse { response }))
}

/// Registers every route on an app. Shared by `startup` and the tests.
pub fn configure(max_payload_size: usize) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::PayloadConfig::new(max_payload_size))
            .service(health)
            .service(list_models)
            .service(generate);
    }
}

/// Installs the process-wide logger. Call once, from the binary.
pub fn init_logging(level: log::LevelFilter) {
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .init();
}

pub async fn startup(
    server_config: ServerConfig,
    gateway_state: GatewayState,
) -> std::io::Result<()> {
    let app_state = web::Data::new(gateway_state);

    log::info!(
        "Starting server at {}:{}",
        server_config.host,
        server_config.port
    );
    let max_payload_size = server_config.max_payload_size;

    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(configure(max_payload_size))
    })
    .bind((server_config.host, server_config.port))?
    .run()
    .await
}
