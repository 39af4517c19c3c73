use classcast_core::IceCandidate;

/// Candidates that arrived before the peer's remote description.
///
/// Holds entries only while the remote description is unset. Once it is
/// applied the queue is drained in arrival order and later candidates pass
/// straight through.
#[derive(Debug, Default)]
pub struct PendingCandidateQueue {
    candidates: Vec<IceCandidate>,
    remote_description_set: bool,
}

impl PendingCandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the candidate back when it can be applied right away.
    pub fn push(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        if self.remote_description_set {
            return Some(candidate);
        }
        self.candidates.push(candidate);
        None
    }

    /// Marks the remote description as applied and hands out everything
    /// buffered so far. Later calls return nothing.
    pub fn drain_on_remote_description(&mut self) -> Vec<IceCandidate> {
        self.remote_description_set = true;
        std::mem::take(&mut self.candidates)
    }

    pub fn has_remote_description(&self) -> bool {
        self.remote_description_set
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
    }
}
