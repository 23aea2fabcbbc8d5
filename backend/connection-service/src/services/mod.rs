pub mod connection_graph;
pub mod message_router;
pub mod notification_emitter;
pub mod user_directory;

pub use connection_graph::{AcceptedConnection, ConnectionGraph, MutualStatus, ToggleOutcome};
pub use message_router::{ConversationSummary, MessageRouter};
pub use notification_emitter::NotificationEmitter;
pub use user_directory::{PgUserDirectory, UserDirectory};

pub(crate) const MAX_PAGE_SIZE: i64 = 100;

/// Clamp pagination inputs and derive the row offset. Saturating math:
/// an absurd page number yields an empty page, never an overflow or a
/// negative OFFSET.
pub(crate) fn page_offset(page: i64, page_size: i64) -> (i64, i64) {
    let page = page.max(1);
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let offset = page.saturating_sub(1).saturating_mul(page_size);
    (page_size, offset)
}

#[cfg(test)]
mod tests {
    use super::page_offset;

    #[test]
    fn page_offset_clamps_both_inputs() {
        assert_eq!(page_offset(1, 50), (50, 0));
        assert_eq!(page_offset(3, 20), (20, 40));
        assert_eq!(page_offset(0, 0), (1, 0));
        assert_eq!(page_offset(-5, 500), (100, 0));
    }

    #[test]
    fn page_offset_saturates_instead_of_overflowing() {
        let (size, offset) = page_offset(i64::MAX, 100);
        assert_eq!(size, 100);
        assert!(offset >= 0);

        let (_, offset) = page_offset(i64::MAX - 1, i64::MAX);
        assert!(offset >= 0);
    }
}
