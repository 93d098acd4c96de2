use crate::model::document::{public_user, without_fields};
use crate::model::{CollectionKind, Snapshot};

/// Destination for the best-effort copy pushed after every local write.
///
/// `push` must return without waiting for delivery. Delivery is at most
/// once: failures are discarded and never retried.
pub trait MirrorSink: Send + Sync {
    fn push(&self, snapshot: Snapshot);
}

/// Mirror used when syncing is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMirror;

impl MirrorSink for NoopMirror {
    fn push(&self, _snapshot: Snapshot) {}
}

/// Strip a snapshot down to what may leave the local store: no large fields
/// on institutions and programs, and users reduced to their public fields.
pub fn sanitize_snapshot(snapshot: &Snapshot) -> Snapshot {
    let strip = |kind: CollectionKind| {
        snapshot
            .collection(kind)
            .iter()
            .map(|record| without_fields(record, kind.large_fields()))
            .collect()
    };
    Snapshot {
        escuelas: strip(CollectionKind::Institutions),
        carreras: strip(CollectionKind::Programs),
        users: snapshot.users.iter().map(public_user).collect(),
    }
}
