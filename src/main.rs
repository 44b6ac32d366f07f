// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use detect_node::{api::start_server, config::ServerConfig};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting Detect Node...\n");
    println!("📦 BUILD VERSION: {}", detect_node::version::get_version_string());
    println!();

    let config = ServerConfig::load();
    config.validate()?;

    println!("🔧 Configuration:");
    println!("   Listen address: {}", config.listen_addr);
    println!("   Model path: {}", config.model_path.display());
    println!("   Max upload: {} bytes", config.max_upload_bytes);
    println!();

    start_server(&config).await?;

    println!("👋 Detect Node stopped");
    Ok(())
}
