use std::fmt;

/// Where a recipient is in the send → record → checkpoint sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecipientState {
    /// Not in the checkpoint, nothing done yet this run.
    Pending,
    /// Handed to the mailer, no confirmation yet.
    Sending,
    /// Accepted by the server and the token is in the ledger.
    Recorded,
    /// In the checkpoint. Terminal.
    Checkpointed,
}

impl RecipientState {
    /// The only state that may follow this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Sending),
            Self::Sending => Some(Self::Recorded),
            Self::Recorded => Some(Self::Checkpointed),
            Self::Checkpointed => None,
        }
    }

    /// Whether moving to `to` is a legal step.
    ///
    /// `Pending → Recorded` is allowed on its own: it is how a token found in
    /// the ledger after a crash is taken over without sending again.
    #[must_use]
    pub fn can_become(self, to: Self) -> bool {
        self.next() == Some(to) || (self == Self::Pending && to == Self::Recorded)
    }
}

impl fmt::Display for RecipientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::Sending => "SENDING",
            Self::Recorded => "RECORDED",
            Self::Checkpointed => "CHECKPOINTED",
        })
    }
}
