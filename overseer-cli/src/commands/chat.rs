use crate::context::{build_client, load_config};

pub async fn cmd_chat(job_id: &str, message: &str) -> anyhow::Result<()> {
    let config = load_config()?;
    let client = build_client(&config)?;

    let reply = client.chat(job_id, message).await?;
    println!("{}", reply.response);

    if let Some(context) = reply.context {
        tracing::debug!(job_id, "chat reply context: {}", context);
    }

    Ok(())
}
