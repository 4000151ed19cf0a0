//! `taskwire save-token`: persist a session token for later runs.

use anyhow::Context;
use taskwire::token::{SessionToken, TokenStore};

pub fn save(store: &TokenStore, raw: &str) -> anyhow::Result<()> {
    let token = SessionToken::parse(raw).context("token is empty")?;
    if token.is_expired() {
        println!("  Warning: this token has already expired.");
    }
    store.save(&token).context("failed to write token file")?;

    println!();
    println!("  Token saved to {}", store.path().display());
    match token.expires_at() {
        Some(exp) => println!("  Expires at: {exp} (unix seconds)"),
        None => println!("  Expiry: unknown (not a JWT)"),
    }
    println!();
    Ok(())
}
