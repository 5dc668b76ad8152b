//! Drift classification
//!
//! Classification depends only on the two timestamps and the two checksums.
//! Timestamps are compared at whole-second precision because that is the
//! finest precision every backend reports.

use chrono::{DateTime, Utc};
use dots_meta::{RemoteObject, SyncState, TrackedFile};

/// The inputs classification reads from one side of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint<'a> {
    pub modified: DateTime<Utc>,
    /// `None` when the side cannot report a checksum.
    pub checksum: Option<&'a str>,
}

impl<'a> Fingerprint<'a> {
    pub fn local(file: &'a TrackedFile) -> Self {
        Self {
            modified: file.modified,
            checksum: Some(file.checksum.as_str()).filter(|c| !c.is_empty()),
        }
    }

    pub fn remote(object: &'a RemoteObject) -> Self {
        Self {
            modified: object.modified,
            checksum: object.checksum.as_deref().filter(|c| !c.is_empty()),
        }
    }
}

/// Classify one file from its local and remote fingerprints.
pub fn classify(local: Option<Fingerprint<'_>>, remote: Option<Fingerprint<'_>>) -> SyncState {
    let (local, remote) = match (local, remote) {
        (Some(local), Some(remote)) => (local, remote),
        (Some(_), None) => return SyncState::NotOnRemote,
        (None, Some(_)) => return SyncState::NotOnLocal,
        (None, None) => return SyncState::Error,
    };

    let local_secs = local.modified.timestamp();
    let remote_secs = remote.modified.timestamp();
    if local_secs > remote_secs {
        return SyncState::LocalNewer;
    }
    if local_secs < remote_secs {
        return SyncState::RemoteNewer;
    }

    match (local.checksum, remote.checksum) {
        (Some(l), Some(r)) if l != r => SyncState::Conflict,
        _ => SyncState::Synced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use rstest::rstest;

    fn at(secs: i64, millis: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, millis * 1_000_000).unwrap()
    }

    fn fp(modified: DateTime<Utc>, checksum: Option<&str>) -> Fingerprint<'_> {
        Fingerprint { modified, checksum }
    }

    #[rstest]
    #[case(Some("abc123"), Some("def456"), SyncState::Conflict)]
    #[case(Some("abc123"), Some("abc123"), SyncState::Synced)]
    #[case(Some("abc123"), None, SyncState::Synced)]
    #[case(None, Some("def456"), SyncState::Synced)]
    #[case(None, None, SyncState::Synced)]
    fn equal_timestamps(
        #[case] local: Option<&str>,
        #[case] remote: Option<&str>,
        #[case] expected: SyncState,
    ) {
        let t = at(1_700_000_000, 0);
        assert_eq!(classify(Some(fp(t, local)), Some(fp(t, remote))), expected);
    }

    #[test]
    fn newer_local_wins_regardless_of_checksums() {
        let remote = at(1_700_000_000, 0);
        let local = remote + Duration::seconds(1);
        assert_eq!(
            classify(Some(fp(local, Some("abc123"))), Some(fp(remote, Some("def456")))),
            SyncState::LocalNewer
        );
        assert_eq!(
            classify(Some(fp(remote, Some("abc123"))), Some(fp(local, Some("abc123")))),
            SyncState::RemoteNewer
        );
    }

    #[test]
    fn sub_second_differences_are_ignored() {
        let local = at(1_700_000_000, 900);
        let remote = at(1_700_000_000, 100);
        assert_eq!(
            classify(Some(fp(local, Some("a"))), Some(fp(remote, Some("a")))),
            SyncState::Synced
        );
    }

    #[test]
    fn missing_sides() {
        let t = at(1_700_000_000, 0);
        assert_eq!(classify(Some(fp(t, None)), None), SyncState::NotOnRemote);
        assert_eq!(classify(None, Some(fp(t, None))), SyncState::NotOnLocal);
        assert_eq!(classify(None, None), SyncState::Error);
    }

    #[test]
    fn empty_checksums_count_as_unknown() {
        let object = RemoteObject {
            key: "dot-sync/configs/shell/.zshrc".into(),
            size: 1,
            modified: at(1_700_000_000, 0),
            checksum: Some(String::new()),
        };
        assert_eq!(Fingerprint::remote(&object).checksum, None);
    }

    proptest! {
        #[test]
        fn classification_is_deterministic(
            local_secs in 0i64..4_000_000_000,
            remote_secs in 0i64..4_000_000_000,
            local_sum in proptest::option::of("[a-f0-9]{1,8}"),
            remote_sum in proptest::option::of("[a-f0-9]{1,8}"),
        ) {
            let local = fp(at(local_secs, 0), local_sum.as_deref());
            let remote = fp(at(remote_secs, 0), remote_sum.as_deref());
            let first = classify(Some(local), Some(remote));
            let second = classify(Some(local), Some(remote));
            prop_assert_eq!(first, second);
            if local_secs > remote_secs {
                prop_assert_eq!(first, SyncState::LocalNewer);
            }
            if first == SyncState::Conflict {
                prop_assert_eq!(local_secs, remote_secs);
            }
        }
    }
}
