use anyhow::Result;

#[derive(Clone, Debug)]
pub struct GenParams {
    /// Total token cap: prompt plus continuation never exceed this.
    pub max_length: usize,
}

pub trait LlmBackend: Send + Sync + 'static {
    /// Run one generation call: tokenize, extend, detokenize.
    /// The returned text echoes the prompt and keeps special tokens.
    fn complete(&self, prompt: &str, params: &GenParams) -> Result<String>;
}

/// How many new tokens a prompt of the given size may still generate.
pub fn token_budget(prompt_tokens: usize, max_length: usize) -> usize {
    max_length.saturating_sub(prompt_tokens)
}

#[cfg(feature = "llama")]
pub mod llama;
