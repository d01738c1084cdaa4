use std::fmt;

/// What one run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Members in the input list.
    pub total: usize,
    /// Already checkpointed by an earlier run.
    pub skipped: usize,
    /// Listed more than once; only the first entry is processed.
    pub duplicates: usize,
    /// Found in the ledger after an interrupted run and checkpointed without
    /// sending.
    pub reconciled: usize,
    /// Mailed, ledgered and checkpointed in this run.
    pub sent: usize,
}

impl RunReport {
    /// Everyone in the list is now checkpointed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.skipped + self.duplicates + self.reconciled + self.sent == self.total
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sent, {} reconciled, {} already sent, {} duplicates ({} members)",
            self.sent, self.reconciled, self.skipped, self.duplicates, self.total
        )
    }
}
