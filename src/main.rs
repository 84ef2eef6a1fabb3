use actix_web::{middleware as actix_middleware, web, App, HttpServer};
use base64::engine::general_purpose::STANDARD as Base64Engine;
use base64::Engine;
use clap::{Parser, Subcommand};
use env_logger::Env;
use rand::RngCore;
use std::io;
use std::sync::Arc;

mod config;
mod errors;
mod middleware;
mod models;
mod routes;
mod services;

use config::Config;
use middleware::auth_gate::AuthenticationGate;
use services::token_service::TokenService;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// cargo run -- generate-secret
    /// cargo run -- generate-secret --bytes 48
    GenerateSecret {
        /// Number of random bytes in the secret (printed base64-encoded)
        #[arg(short, long, default_value_t = 64)]
        bytes: usize,
    },
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::GenerateSecret { bytes }) => {
            generate_secret(bytes);
            Ok(())
        }
        None => start_server().await,
    }
}

fn generate_secret(bytes: usize) {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    println!("{}", Base64Engine.encode(&buf));
}

async fn start_server() -> io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env();

    // Built once at startup; every request shares the same immutable options.
    let token_service = Arc::new(TokenService::new(&config.jwt));
    let auth_gate = AuthenticationGate::new(token_service.clone());

    let app_state = routes::AppState { token_service };

    let bind_address = config.bind_address.clone();
    log::info!("Starting server at {}", bind_address);

    HttpServer::new(move || {
        let auth_gate = auth_gate.clone();
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(actix_middleware::Logger::default())
            .configure(|cfg| routes::init_routes(cfg, auth_gate))
    })
    .bind(&bind_address)
    .map_err(|e| {
        log::error!("Failed to bind server to {}: {}", bind_address, e);
        e
    })?
    .run()
    .await
}
