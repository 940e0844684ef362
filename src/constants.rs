/// Public certificate identifier prefix, e.g. `CERT-aB3xY9kQ2m`.
pub const CERT_ID_PREFIX: &str = "CERT-";

/// Random characters after the prefix.
pub const CERT_ID_LEN: usize = 10;

/// Invite links stop working after this many hours.
pub const INVITE_TTL_HOURS: i64 = 24;

/// Upper bound for a roster CSV upload, in bytes.
pub const MAX_ROSTER_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
