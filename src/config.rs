use clap::Parser;

/// Default model loaded when nothing else is configured.
pub const DEFAULT_MODEL_PATH: &str = "models/phi-2.Q4_K_M.gguf";

#[derive(Parser, Debug, Clone)]
pub struct Config {
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: String,
    #[arg(long, env, default_value_t = 4096)]
    pub n_ctx: u32,
    /// Layers offloaded to the accelerator when one is compiled in.
    #[arg(long, env, default_value_t = 1_000_000)]
    pub n_gpu_layers: u32,
    /// Hard cap on prompt tokens + generated tokens per request.
    #[arg(long, env, default_value_t = 200)]
    pub max_length: usize,
}
