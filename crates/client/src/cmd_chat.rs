//! `taskwire chat`: stream a chatbot reply to stdout.

use std::io::Write;

use futures::StreamExt;
use taskwire::chat::ChatClient;
use taskwire::config::Settings;
use taskwire::rest::HttpCollaborator;
use taskwire::token::SessionToken;

pub async fn run(
    settings: &Settings,
    token: Option<SessionToken>,
    session_id: i64,
    message: &str,
) -> anyhow::Result<()> {
    if token.is_none() {
        anyhow::bail!("chat needs a session token (--token, TASKWIRE_TOKEN, or save-token)");
    }
    let client = ChatClient::new(HttpCollaborator::new(settings.origin.clone(), token)?);
    let mut reply = client.send(session_id, message).await?;

    let mut stdout = std::io::stdout();
    while let Some(chunk) = reply.next().await {
        stdout.write_all(chunk?.as_bytes())?;
        stdout.flush()?;
    }
    writeln!(stdout)?;
    Ok(())
}
