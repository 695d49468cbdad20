use std::path::Path;

use super::{print_json, Context};

/// Print the normalized payload. Values are re-coerced against the
/// catalog, so the output is what `submit` would send.
pub(crate) async fn cmd_payload(ctx: &Context, request: &Path) {
    let session = ctx.load_session(request).await;
    if !ctx.quiet {
        print_json(&session.payload());
    }
}
