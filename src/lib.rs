//! # Tessera (ticket authentication and session lifecycle)
//!
//! `tessera` authenticates tenant-scoped credentials, issues opaque session
//! tickets, and resolves tickets back to profiles through an in-memory
//! authentication cache.
//!
//! ## Session lifecycle
//!
//! 1. Credentials are validated against the stored Argon2 hash of the profile.
//! 2. A ticket is issued and persisted with `issued_at = last_access_at = now`.
//! 3. Later requests present only the ticket; the cache answers first and the
//!    ticket + profile stores are consulted on a miss or a forced reload.
//! 4. Invalidation removes the cache entry and deletes the ticket.
//! 5. A background reaper deletes tickets idle for longer than the configured
//!    inactivity window.
//!
//! The ticket and profile stores are authoritative. The cache is disposable and
//! can be replaced with [`auth::NoopAuthenticationCache`] without changing any
//! outcome.

pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
