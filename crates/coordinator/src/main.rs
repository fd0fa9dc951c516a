// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use crawd_coordinator::config::CoordinatorConfig;

#[tokio::main]
async fn main() {
    let config = CoordinatorConfig::parse();

    crawd_coordinator::init_tracing(&config);

    if let Err(e) = crawd_coordinator::run(config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
