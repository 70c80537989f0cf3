mod note;

pub use note::{Note, NoteInput};

use chrono::{DateTime, SubsecRound, Utc};

/// Current time truncated to the microsecond precision the store persists,
/// so a freshly built record compares equal to the one read back.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
