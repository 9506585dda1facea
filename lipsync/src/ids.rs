use std::sync::atomic::{AtomicU32, Ordering};

// Session ids are process-global so a sink can never be mistaken for one handed out by another
// engine instance.
static NEXT_SESSION_ID: AtomicU32 = AtomicU32::new(1);

pub(crate) fn next_session_id() -> u32 {
    NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
}
