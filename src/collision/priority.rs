//! Priority extraction and the stable-sort comparator used to order
//! waiting jobs before `checkBusy` walks them.

use std::sync::Arc;

use super::job_context::{AttrKey, CollisionJobContext, STEALING_PRIORITY_ATTR};

/// `priority(ctx) = ctx[STEALING_PRIORITY_ATTR]` or `0` if absent. An
/// attribute present with a non-integer shape is a fault: logged once
/// and treated as the default rather than propagated, per the spec's
/// "do not throw" rule for this read.
pub fn read(ctx: &dyn CollisionJobContext) -> i64 {
    let attrs = ctx.job_context().lock();
    match attrs.get(&AttrKey::StealingPriority) {
        Some(v) => v.as_int().unwrap_or_else(|| {
            tracing::warn!(
                attribute = STEALING_PRIORITY_ATTR,
                "job attribute is not an integer, defaulting priority to 0"
            );
            0
        }),
        None => 0,
    }
}

/// Sort waiting jobs by descending priority, ties preserving input
/// order. `slice::sort_by` is a stable sort, so a plain descending key
/// comparison already satisfies the tie-break rule.
pub fn sort_by_priority_desc(waiting: &mut [Arc<dyn CollisionJobContext>]) {
    waiting.sort_by(|a, b| read(b.as_ref()).cmp(&read(a.as_ref())));
}
