use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Output paths written by format conversion during this run.
///
/// Checking that a destination is free and reserving it happen under one
/// lock, so two sources normalizing to the same file (`a.gif`, `a.webp` ->
/// `a.jpg`) can't both write it.
#[derive(Debug, Default)]
pub struct DestinationClaims {
    claimed: Mutex<HashSet<PathBuf>>,
}

impl DestinationClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `destination`. Returns false if it is already on disk or
    /// another candidate claimed it first. Claims are held for the whole run.
    pub fn claim(&self, destination: &Path) -> bool {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        if claimed.contains(destination) || destination.exists() {
            return false;
        }
        claimed.insert(destination.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn first_claim_wins() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("a.jpg");
        let claims = DestinationClaims::new();

        assert!(claims.claim(&dest));
        assert!(!claims.claim(&dest));
    }

    #[test]
    fn existing_file_cannot_be_claimed() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("a.jpg");
        fs::write(&dest, b"unrelated").unwrap();

        assert!(!DestinationClaims::new().claim(&dest));
    }

    #[test]
    fn concurrent_claims_grant_one() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("a.jpg");
        let claims = DestinationClaims::new();

        let granted = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| claims.claim(&dest))).collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(granted, 1);
    }
}
