//! Remove command

use crate::app::RmArgs;
use anyhow::Result;
use docent_core::Assistant;

pub async fn run(args: RmArgs, assistant: &Assistant) -> Result<()> {
    assistant.remove(args.doc_id).await?;
    println!("removed document {}", args.doc_id);
    Ok(())
}
