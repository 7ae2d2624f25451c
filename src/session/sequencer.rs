/// Orders completions of overlapping asynchronous requests.
///
/// Every request takes a strictly increasing ticket. A completion may be
/// applied only if its ticket is not older than the last one applied, and
/// the high-water mark moves only when the caller [`commit`](Self::commit)s
/// a successful application. Requests are never cancelled; stale results
/// are simply dropped on arrival.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSequencer {
    latest: u64,
    last_applied: u64,
}

impl RequestSequencer {
    /// Fresh sequencer; the first ticket is 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next ticket.
    pub fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    /// Whether a completion carrying `ticket` may still be applied.
    #[must_use]
    pub fn is_current(&self, ticket: u64) -> bool {
        ticket >= self.last_applied
    }

    /// Record that `ticket`'s result was applied. Never moves backwards.
    pub fn commit(&mut self, ticket: u64) {
        self.last_applied = self.last_applied.max(ticket);
    }

    /// Highest ticket applied so far (0 before any).
    #[must_use]
    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }

    /// Highest ticket issued so far.
    #[must_use]
    pub fn latest_issued(&self) -> u64 {
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_order_completions_apply_only_newest() {
        let mut seq = RequestSequencer::new();
        let tickets = [seq.issue(), seq.issue(), seq.issue()];
        assert_eq!(tickets, [1, 2, 3]);

        let mut applied = Vec::new();
        for ticket in [3, 1, 2] {
            if seq.is_current(ticket) {
                seq.commit(ticket);
                applied.push(ticket);
            }
        }
        assert_eq!(applied, vec![3]);
        assert_eq!(seq.last_applied(), 3);
    }

    #[test]
    fn in_order_completions_all_apply() {
        let mut seq = RequestSequencer::new();
        let tickets: Vec<u64> = (0..4).map(|_| seq.issue()).collect();
        for t in tickets {
            assert!(seq.is_current(t));
            seq.commit(t);
        }
        assert_eq!(seq.last_applied(), 4);
    }

    #[test]
    fn failed_application_does_not_advance() {
        let mut seq = RequestSequencer::new();
        let first = seq.issue();
        let second = seq.issue();
        // `second` failed to decode: no commit.
        assert!(seq.is_current(second));
        assert_eq!(seq.last_applied(), 0);
        // The older request may still land.
        assert!(seq.is_current(first));
        seq.commit(first);
        assert_eq!(seq.last_applied(), first);
    }

    #[test]
    fn last_applied_never_decreases() {
        let mut seq = RequestSequencer::new();
        for _ in 0..5 {
            let _ = seq.issue();
        }
        let mut prev = 0;
        for ticket in [2, 5, 1, 4, 3] {
            if seq.is_current(ticket) {
                seq.commit(ticket);
            }
            assert!(seq.last_applied() >= prev);
            prev = seq.last_applied();
        }
        assert_eq!(prev, 5);
    }
}
