//! AI farming assistant

use validator::Validate;

use super::ApiClient;
use crate::error::ClientResult;
use crate::models::{AskAiRequest, AskAiResponse};

impl ApiClient {
    /// Ask a free-form farming question.
    ///
    /// A blank question is rejected locally with
    /// [`ClientError::InvalidInput`](crate::error::ClientError::InvalidInput).
    /// Backend failures surface as `ClientError::Api` carrying the backend's
    /// `error` text.
    pub async fn ask_ai(&self, question: &str) -> ClientResult<String> {
        let request = AskAiRequest::new(question);
        request.validate()?;

        let response: AskAiResponse = self.post("/api/ask-ai/", &request).await?;
        Ok(response.answer)
    }
}
