//! ESI handle encoding commands.

use anyhow::Result;
use edge_cache::EsiHandleCodec;

use super::{EsiArgs, EsiCommand};
use crate::context::Context;

/// Run the esi command.
pub fn run(args: EsiArgs, ctx: &Context) -> Result<()> {
    let config = ctx.cache_config()?;
    let codec = EsiHandleCodec::from_config(&config.esi);

    match args.command {
        EsiCommand::Encode { handles } => {
            let encoded = codec.encode(&handles);
            if ctx.output.is_json() {
                ctx.output.json(&serde_json::json!({
                    "handles": handles,
                    "encoded": encoded,
                }));
            } else {
                ctx.output.plain(&encoded);
            }
        }
        EsiCommand::Decode { param } => {
            let handles = codec.decode(&param);
            if ctx.output.is_json() {
                ctx.output.json(&handles);
            } else {
                for handle in &handles {
                    ctx.output.plain(handle);
                }
            }
        }
        EsiCommand::Url {
            block,
            base_url,
            handles,
        } => {
            let base = base_url
                .or_else(|| ctx.config.base_url.clone())
                .unwrap_or_default();
            let url = codec.url(&base, &handles, &block);
            if ctx.output.is_json() {
                ctx.output.json(&serde_json::json!({ "url": url }));
            } else {
                ctx.output.plain(&url);
            }
        }
    }

    Ok(())
}
