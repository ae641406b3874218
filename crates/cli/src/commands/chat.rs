//! Chat command

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, ChatRequest, ChatResponse};
use crate::output::{print_json, OutputFormat};

/// Send one question to the assistant and print the reply
pub async fn ask(client: &ApiClient, message: &str, format: OutputFormat) -> Result<()> {
    let request = ChatRequest {
        message: message.to_string(),
    };
    let reply: ChatResponse = client.post("api/chat", &request).await?;

    match format {
        OutputFormat::Json => print_json(&reply)?,
        OutputFormat::Table => {
            println!("{} {}", "You:".bold(), message);
            println!("{} {}", "Assistant:".cyan().bold(), reply.response);
        }
    }
    Ok(())
}
