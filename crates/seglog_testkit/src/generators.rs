//! Property-based test generators using proptest.
//!
//! Provides strategies for generating journal entries, configurations and
//! operation sequences that keep the journal's preconditions intact.

use proptest::prelude::*;
use seglog_journal::{JournalConfig, StorageLevel, DESCRIPTOR_BYTES, FRAME_HEADER_BYTES};
use serde::{Deserialize, Serialize};

/// Largest payload produced by [`payload_strategy`].
pub const MAX_PAYLOAD: usize = 256;

/// Strategy for generating raw entry payloads.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..MAX_PAYLOAD)
}

/// Strategy for generating a batch of payloads.
pub fn payloads_strategy(max_count: usize) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(payload_strategy(), 1..=max_count)
}

/// A structured entry, as a consensus module would store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Term the command was proposed in.
    pub term: u64,
    /// Key written.
    pub key: String,
    /// Value written, `None` for a delete.
    pub value: Option<Vec<u8>>,
}

/// Strategy for generating commands.
pub fn command_strategy() -> impl Strategy<Value = Command> {
    (
        0u64..1_000,
        prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex"),
        prop::option::of(prop::collection::vec(any::<u8>(), 0..64)),
    )
        .prop_map(|(term, key, value)| Command { term, key, value })
}

/// Strategy for in-memory journal configurations whose segments always fit
/// at least one [`MAX_PAYLOAD`] entry.
pub fn memory_config_strategy() -> impl Strategy<Value = JournalConfig> {
    let min_segment = DESCRIPTOR_BYTES + FRAME_HEADER_BYTES + MAX_PAYLOAD;
    (
        min_segment..min_segment * 8,
        prop::sample::select(vec![0.01, 0.1, 0.5, 0.99]),
    )
        .prop_map(|(segment_size, density)| {
            JournalConfig::new()
                .name("prop")
                .storage_level(StorageLevel::Memory)
                .max_segment_size(segment_size as u32)
                .index_density(density)
        })
}

/// One step applied to a journal by the model harness.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Append an entry at the next index.
    Append(Vec<u8>),
    /// Truncate, keeping this share (0..=100 percent) of the live entries.
    Truncate(u8),
    /// Replace the entry at this share of the log through `append_indexed`.
    Overwrite(u8, Vec<u8>),
    /// Commit everything written so far.
    Commit,
    /// Compact below this share of the log.
    Compact(u8),
    /// Flush the writer.
    Flush,
}

/// Strategy for generating single operations, weighted toward appends.
pub fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        6 => payload_strategy().prop_map(Operation::Append),
        1 => (0u8..=100).prop_map(Operation::Truncate),
        1 => ((0u8..=100), payload_strategy()).prop_map(|(at, entry)| Operation::Overwrite(at, entry)),
        1 => Just(Operation::Commit),
        1 => (0u8..=100).prop_map(Operation::Compact),
        1 => Just(Operation::Flush),
    ]
}

/// Strategy for generating operation sequences.
pub fn operations_strategy(max_len: usize) -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(operation_strategy(), 1..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn configs_are_valid(config in memory_config_strategy()) {
            prop_assert!(config.validate().is_ok());
        }

        #[test]
        fn commands_have_keys(command in command_strategy()) {
            prop_assert!(!command.key.is_empty());
        }
    }
}
