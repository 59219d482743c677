//! Shared naming for staged files and object keys.
//!
//! Local layout: `<uploads_root>/<token>/<basename>`. Object key:
//! `<token>/<basename>`. Both use [`sanitize_basename`].

use intake_core::constants::UPLOADS_LOCATOR_PREFIX;
use intake_core::UploadToken;

/// Name used when nothing usable is left after sanitizing.
pub const FALLBACK_BASENAME: &str = "upload";

/// Reduce a client-supplied filename to a safe basename.
///
/// Directory components (either separator) are dropped and every space becomes
/// an underscore. `.`/`..` and empty names collapse to [`FALLBACK_BASENAME`].
pub fn sanitize_basename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .replace(' ', "_");

    match base.as_str() {
        "" | "." | ".." => FALLBACK_BASENAME.to_string(),
        _ => base,
    }
}

/// Object-store key for an upload.
pub fn object_key(token: &UploadToken, filename: &str) -> String {
    format!("{}/{}", token, sanitize_basename(filename))
}

/// Caller-facing fragment for a staged file.
pub fn local_locator(token: &UploadToken, filename: &str) -> String {
    format!(
        "{}/{}/{}",
        UPLOADS_LOCATOR_PREFIX,
        token,
        sanitize_basename(filename)
    )
}
