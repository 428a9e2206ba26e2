//! rblwatch - DNSBL checker and reputation monitor
//!
//! Checks IPs and domains against DNS blacklists and watches them for
//! listing changes.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    rblwatch_cli::run().await
}
