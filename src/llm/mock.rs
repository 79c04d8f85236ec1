//! Mock LLM 客户端（用于测试与无 API Key 的本地运行）
//!
//! 取最后一条 User 消息回显，便于不接真实大模型跑通完整流程。

use async_trait::async_trait;

use crate::llm::{LlmClient, Message, Role};

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(format!("你说：{}，这是大模型的回复示例。", last_user))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_echoes_last_user_message() {
        let client = MockLlmClient;
        let reply = client
            .complete(&[Message::system("sys"), Message::user("你好")])
            .await
            .unwrap();
        assert!(reply.contains("你好"));
    }
}
