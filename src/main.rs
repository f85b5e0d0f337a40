use dotenvy::dotenv;
use genline::config::Config;
use genline::model::llama::LlamaBackend;
use genline::model::GenParams;
use genline::protocol;
use std::io;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = <Config as clap::Parser>::parse();

    // logs go to stderr; stdout carries the reply protocol
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    tracing::info!(model = %cfg.model_path, "loading model");
    let backend = LlamaBackend::new(cfg.model_path.into(), cfg.n_ctx, cfg.n_gpu_layers)?;

    let params = GenParams {
        max_length: cfg.max_length,
    };

    tracing::info!("model loaded, reading prompts from stdin");
    let stdin = io::stdin();
    let stdout = io::stdout();
    protocol::serve(&backend, &params, stdin.lock(), stdout.lock())?;
    Ok(())
}
