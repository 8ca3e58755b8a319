//! Tsudoi room server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsudoi-server
//! cargo run --bin tsudoi-server -- --host 0.0.0.0 --port 3000
//! ```
//!
//! OpenAI and Cloudinary credentials are read from the environment
//! (or an `app.env` / `.env` file).

use std::sync::Arc;

use clap::Parser;
use tsudoi_server::{
    config::ServiceConfig,
    infrastructure::{
        blob_storage::CloudinaryBlobStorage,
        image_generator::OpenAiImageGenerator,
        message_pusher::WebSocketMessagePusher,
        repository::{InMemoryConnectionRepository, InMemoryRoomRepository},
    },
    ui::{AppState, Dependencies, Server},
};
use tsudoi_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "tsudoi-server")]
#[command(about = "Collaborative image generation room server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Default log level when RUST_LOG is not set
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = match ServiceConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize dependencies in order:
    // 1. Repositories
    // 2. MessagePusher
    // 3. External services
    // 4. UseCases (AppState)
    // 5. Server

    // 1. Create Repositories (in-memory database)
    let rooms = Arc::new(InMemoryRoomRepository::with_capacity(
        config.room_max_members,
        config.room_history_capacity,
    ));
    let connections = Arc::new(InMemoryConnectionRepository::new());

    // 2. Create MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    // 3. Create external service clients
    let image_generator = Arc::new(
        OpenAiImageGenerator::new(
            config.open_ai_key.clone(),
            config.openai_image_model.clone(),
            config.openai_image_size.clone(),
        )
        .with_base_url(config.openai_base_url.clone()),
    );
    let blob_storage = Arc::new(
        CloudinaryBlobStorage::new(config.cloudinary_credentials())
            .with_base_url(config.cloudinary_base_url.clone()),
    );

    // 4. Create UseCases
    let app_state = AppState::from_dependencies(Dependencies {
        rooms,
        connections,
        message_pusher,
        image_generator,
        blob_storage,
        clock: Arc::new(SystemClock),
        generation_timeout: config.generation_timeout(),
    });

    // 5. Create and run the server
    let server = Server::new(app_state);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
