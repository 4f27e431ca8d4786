//! Maps a request path to a [`FreshnessPolicy`] using substring heuristics
//! over Debian mirror layout conventions. Mis-classification only costs
//! extra origin traffic or a slightly stale index, never corrupted data, so
//! the rules favor cheap string matching over structural path parsing.

/// Whether a cache hit may be served directly, revalidated, or must always
/// be checked against the origin before being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    /// Honor client `If-Modified-Since` and gate `304` on stored `Last-Modified`.
    pub use_conditional: bool,
    /// Revalidate a cache hit against the origin via conditional `HEAD` before serving it.
    pub validate_with_origin: bool,
}

impl FreshnessPolicy {
    /// The only override the engine honors: release-file routes force both
    /// flags on regardless of what [`classify`] would otherwise compute.
    pub const FORCE_REVALIDATE: FreshnessPolicy = FreshnessPolicy {
        use_conditional: true,
        validate_with_origin: true,
    };
}

const METADATA_BASENAME_TOKENS: &[&str] = &[
    "Release",
    "Release.gpg",
    "InRelease",
    "Packages",
    "Packages.gz",
    "Packages.xz",
    "Sources",
    "Sources.gz",
    "Sources.xz",
    "Contents-",
    "Index",
];

const CRITICAL_TOKENS: &[&str] = &["Release", "Release.gpg", "InRelease"];
const DISTS_INDEX_TOKENS: &[&str] = &["Packages", "Sources", "Contents"];

/// Pure function: same path always yields the same policy.
pub fn classify(path: &str) -> FreshnessPolicy {
    FreshnessPolicy {
        use_conditional: use_conditional(path),
        validate_with_origin: validate_with_origin(path),
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn use_conditional(path: &str) -> bool {
    if path.contains("/dists/") {
        true
    } else if path.contains("/pool/") {
        false
    } else {
        let base = basename(path);
        METADATA_BASENAME_TOKENS.iter().any(|t| base.contains(t))
    }
}

fn validate_with_origin(path: &str) -> bool {
    if CRITICAL_TOKENS.iter().any(|t| path.contains(t)) {
        true
    } else if path.contains("/dists/") && DISTS_INDEX_TOKENS.iter().any(|t| path.contains(t)) {
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dists_inrelease_is_critical_metadata() {
        let p = classify("/ubuntu/dists/jammy/InRelease");
        assert!(p.use_conditional);
        assert!(p.validate_with_origin);
    }

    #[test]
    fn dists_packages_revalidates_but_is_not_critical() {
        let p = classify("/ubuntu/dists/jammy/main/binary-amd64/Packages.gz");
        assert!(p.use_conditional);
        assert!(p.validate_with_origin);
    }

    #[test]
    fn pool_object_is_immutable() {
        let p = classify("/ubuntu/pool/main/h/hello/hello_2.10-2_amd64.deb");
        assert!(!p.use_conditional);
        assert!(!p.validate_with_origin);
    }

    #[test]
    fn dists_non_index_file_still_uses_conditional_but_not_revalidated() {
        let p = classify("/ubuntu/dists/jammy/main/binary-amd64/by-hash/SHA256/abc");
        assert!(p.use_conditional);
        assert!(!p.validate_with_origin);
    }

    #[test]
    fn unclassified_path_defaults_to_no_conditional() {
        let p = classify("/ubuntu/some/random/file.txt");
        assert!(!p.use_conditional);
        assert!(!p.validate_with_origin);
    }

    #[test]
    fn basename_metadata_token_outside_dists_still_uses_conditional() {
        let p = classify("/ubuntu/Release");
        assert!(p.use_conditional);
        assert!(p.validate_with_origin);
    }

    #[test]
    fn classify_is_pure() {
        let path = "/ubuntu/dists/jammy/Release";
        assert_eq!(classify(path), classify(path));
    }
}
