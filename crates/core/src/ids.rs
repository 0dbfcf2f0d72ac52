//! Typed identifiers used across the station control service.

crate::define_id! {
    /// Identifies a batch (a per-station execution slot) across its config,
    /// worker subprocess, and IPC traffic.
    pub struct BatchId("bat-");
}

crate::define_id! {
    /// Identifies a single sequence execution. Exposed to operators and the
    /// backend as the 8-char suffix (see [`BatchId::short`]-style use at the
    /// call site — the full id carries the type prefix internally).
    pub struct ExecutionId("exe-");
}

crate::define_id! {
    /// Identifies a durable offline-queue entry.
    pub struct QueueEntryId("que-");
}

crate::define_id! {
    /// Identifies a connected push subscriber.
    pub struct SubscriberId("sub-");
}

impl ExecutionId {
    /// The short execution id shown to operators and sent to the backend
    /// (spec.md calls for an "8-char execution id").
    pub fn short_code(&self) -> &str {
        let suffix = self.suffix();
        &suffix[..suffix.len().min(8)]
    }
}
