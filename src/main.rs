use clap::Parser;
use llm_gateway::config::ProcessEnv;
use llm_gateway::gateway_state::GatewayState;
use llm_gateway::server::{self, ServerConfig};
use std::sync::Arc;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(author, version, about = "HTTP gateway to an OpenAI-compatible LLM service")]
struct Args {
    #[arg(long, default_value = "0.0.0.0", help = "Host address to bind the server to")]
    host: String,

    #[arg(long, default_value_t = 5000, help = "Port number to listen on")]
    port: u16,

    #[arg(
        long,
        default_value_t = server::DEFAULT_MAX_PAYLOAD_SIZE,
        help = "Maximum request body size in bytes"
    )]
    max_payload_size: usize,

    #[arg(
        long,
        default_value_t = log::LevelFilter::Info,
        help = "Log level: off, error, warn, info, debug or trace"
    )]
    log_level: log::LevelFilter,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    server::init_logging(args.log_level);

    let gateway_state = GatewayState::with_http_backend(Arc::new(ProcessEnv))?;
    let server_config = ServerConfig {
        host: args.host,
        port: args.port,
        max_payload_size: args.max_payload_size,
    };

    actix_web::rt::System::new().block_on(async move {
        tokio::select! {
            res = server::startup(server_config, gateway_state) => res?,
            _ = signal::ctrl_c() => {
                log::info!("Received Ctrl+C, shutting down");
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}
