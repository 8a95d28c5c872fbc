//! Scripted chat model shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use llm2048::{ChatModel, CompletionOptions, LlmError, LlmErrorKind, ModelInfo};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Replies from a fixed script and counts calls.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, LlmErrorKind>>>,
    fallback: String,
    delay: Duration,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    /// Always answers `reply`.
    pub fn always(reply: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: reply.to_string(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answers from `script` in order, then `reply` forever.
    pub fn scripted(script: Vec<Result<String, LlmErrorKind>>, reply: &str) -> Self {
        let model = Self::always(reply);
        *model.replies.lock().expect("lock") = script.into();
        model
    }

    /// Waits `delay` before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `complete` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &self,
        prompt: &str,
        _system: &str,
        _options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().expect("lock").push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.replies.lock().expect("lock").pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(kind)) => Err(LlmError::new(kind, "scripted failure".to_string())),
            None => Ok(self.fallback.clone()),
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        Ok(vec![ModelInfo {
            name: "scripted".to_string(),
            size_bytes: None,
        }])
    }
}
