#![allow(clippy::doc_markdown)] // generated constants lack backticks

use std::sync::LazyLock;

include!(concat!(env!("OUT_DIR"), "/built.rs"));

/// Package version, suffixed with the git commit (and `-dirty` for uncommitted
/// changes) when built from a checkout. Reported at startup and in `@PG VN`.
pub static VERSION: LazyLock<String> = LazyLock::new(|| match (GIT_COMMIT_HASH, GIT_DIRTY) {
    (Some(hash), Some(true)) => format!("{PKG_VERSION}-{hash}-dirty"),
    (Some(hash), _) => format!("{PKG_VERSION}-{hash}"),
    (None, _) => PKG_VERSION.to_string(),
});
