use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{GenerateRequest, GenerateResponse, GenerativeClient};
use crate::media::MediaRef;

/// Replays canned responses in order and records every request it sees.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<anyhow::Result<GenerateResponse>>>,
    pub seen: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_text(self, text: &str) -> Self {
        self.push(Ok(GenerateResponse {
            text: Some(text.to_string()),
            media: vec![],
        }))
    }

    pub fn reply_media(self, media: MediaRef) -> Self {
        self.push(Ok(GenerateResponse {
            text: None,
            media: vec![media],
        }))
    }

    pub fn reply_empty(self) -> Self {
        self.push(Ok(GenerateResponse::default()))
    }

    pub fn fail(self, msg: &str) -> Self {
        self.push(Err(anyhow::anyhow!(msg.to_string())))
    }

    fn push(self, reply: anyhow::Result<GenerateResponse>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn request(&self, i: usize) -> GenerateRequest {
        self.seen.lock().unwrap()[i].clone()
    }
}

#[async_trait]
impl GenerativeClient for ScriptedClient {
    async fn generate(&self, request: GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.seen.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted reply left")))
    }
}
