//! Cache tag translation.

use anyhow::Result;
use edge_cache::{translate_and_join, translate_tags};

use super::TranslateArgs;
use crate::context::Context;

/// Run the translate command.
pub fn run(args: TranslateArgs, ctx: &Context) -> Result<()> {
    if args.join {
        let joined = translate_and_join(&args.tags);
        if ctx.output.is_json() {
            ctx.output.json(&joined);
        } else {
            ctx.output.plain(&joined);
        }
        return Ok(());
    }

    let translated = translate_tags(&args.tags);
    if ctx.output.is_json() {
        ctx.output.json(&translated);
        return Ok(());
    }

    for (tag, short) in args.tags.iter().zip(&translated) {
        ctx.output.debug(&format!("{} -> {}", tag, short));
        ctx.output.plain(short);
    }

    Ok(())
}
