use super::{token_budget, GenParams, LlmBackend};
use anyhow::{anyhow, bail, Context, Result};
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend as LLBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::sampling::LlamaSampler;
use llama_cpp_2::token::LlamaToken;
use llama_cpp_2::{send_logs_to_tracing, LogOptions};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;

/// True when this build carries an accelerator-enabled llama.cpp.
fn accelerator_available() -> bool {
    cfg!(any(feature = "cuda", feature = "metal", feature = "vulkan"))
}

pub struct Inner {
    backend: LLBackend,
    model: LlamaModel,
    n_ctx: NonZeroU32,
}

#[derive(Clone)]
pub struct LlamaBackend {
    inner: Arc<Inner>,
}

impl LlamaBackend {
    pub fn new(model_path: PathBuf, n_ctx: u32, n_gpu_layers: u32) -> Result<Self> {
        // route llama.cpp logs to tracing so they land on stderr with ours
        send_logs_to_tracing(LogOptions::default());

        let backend = LLBackend::init().context("init llama backend")?;
        let n_ctx = NonZeroU32::new(n_ctx).ok_or_else(|| anyhow!("n_ctx must be nonzero"))?;

        let device = if accelerator_available() { "gpu" } else { "cpu" };
        let offload = if accelerator_available() { n_gpu_layers } else { 0 };
        tracing::info!(device, n_gpu_layers = offload, "selected compute device");

        let mut model_params = LlamaModelParams::default();
        if offload > 0 {
            model_params = model_params.with_n_gpu_layers(offload);
        }

        let model = LlamaModel::load_from_file(&backend, model_path, &model_params)
            .context("load GGUF model")?;

        Ok(Self {
            inner: Arc::new(Inner { backend, model, n_ctx }),
        })
    }

    /// Render a token sequence as text, special tokens in textual form.
    fn detokenize(&self, tokens: &[LlamaToken]) -> Result<String> {
        let mut out = String::new();
        let mut decoder = encoding_rs::UTF_8.new_decoder();
        for &token in tokens {
            let bytes = self.inner.model.token_to_bytes(token, Special::Tokenize)?;
            let mut piece = String::with_capacity(bytes.len());
            let _ = decoder.decode_to_string(&bytes, &mut piece, false);
            out.push_str(&piece);
        }
        Ok(out)
    }
}

impl LlmBackend for LlamaBackend {
    fn complete(&self, prompt: &str, p: &GenParams) -> Result<String> {
        let tokens = self
            .inner
            .model
            .str_to_token(prompt, AddBos::Always)
            .context("tokenize prompt")?;

        // Total-length cap. A prompt already at or past the cap generates
        // nothing and is echoed back without touching a context.
        let max_new = token_budget(tokens.len(), p.max_length);
        if max_new == 0 {
            return self.detokenize(&tokens);
        }

        // Build a fresh context per request to keep state simple and avoid cross-request leakage.
        let ctx_params = LlamaContextParams::default()
            .with_n_ctx(Some(self.inner.n_ctx))
            .with_n_threads(num_cpus::get() as i32)
            .with_n_threads_batch(num_cpus::get() as i32);

        let mut ctx = self
            .inner
            .model
            .new_context(&self.inner.backend, ctx_params)
            .context("create llama context")?;

        let n_ctx = ctx.n_ctx() as usize;
        if tokens.len() + 8 > n_ctx {
            bail!("prompt too long for context ({} tokens, n_ctx {n_ctx})", tokens.len());
        }

        let mut batch = LlamaBatch::new(tokens.len(), 1);
        let last_index: i32 = (tokens.len() - 1) as i32;
        for (i, token) in (0_i32..).zip(tokens.iter().copied()) {
            let is_last = i == last_index;
            batch.add(token, i, &[0], is_last)?;
        }
        ctx.decode(&mut batch).context("decode prompt")?;

        // No sampling parameters are configured: default greedy selection,
        // stopping at the model's end-of-generation token.
        let mut sampler = LlamaSampler::greedy();

        let mut sequence = tokens;
        let mut n_cur = batch.n_tokens();
        let mut n_decode = 0usize;

        while n_decode < max_new {
            let token = sampler.sample(&ctx, batch.n_tokens() - 1);
            sampler.accept(token);

            if self.inner.model.is_eog_token(token) {
                break;
            }
            sequence.push(token);

            batch.clear();
            batch.add(token, n_cur, &[0], true)?;
            n_cur += 1;
            ctx.decode(&mut batch).context("decode step")?;
            n_decode += 1;
        }

        self.detokenize(&sequence)
    }
}
