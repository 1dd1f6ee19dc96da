//! Object key derivation for uploads.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Last stamp handed out, shared by every caller in the process.
static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// Derive `{unix_millis}-{basename}` for an uploaded file.
///
/// Stamps are strictly increasing within the process, so two files with the
/// same name uploaded in the same millisecond still get distinct keys.
pub fn derive_key(file_name: &str) -> String {
    format!("{}-{}", next_stamp(), basename(file_name))
}

fn next_stamp() -> i64 {
    let now = Utc::now().timestamp_millis();
    let previous = LAST_STAMP
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(now);
    now.max(previous + 1)
}

/// Strip any client-supplied directory components.
fn basename(file_name: &str) -> &str {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();
    if name.is_empty() {
        "upload"
    } else {
        name
    }
}
