//! Cross-crate integration test helpers.
//!
//! [`JournalModel`] drives a journal and a plain `Vec` side by side so
//! property tests can check that every operation sequence leaves the
//! journal holding exactly what the model predicts.

use crate::fixtures::TempJournal;
use crate::generators::Operation;
use seglog_journal::Indexed;

/// A journal paired with the entries it is expected to hold.
pub struct JournalModel {
    fixture: TempJournal,
    /// Entry `i` is expected at index `i + 1`.
    expected: Vec<Vec<u8>>,
    committed: u64,
}

impl JournalModel {
    /// Wraps an empty journal.
    pub fn new(fixture: TempJournal) -> Self {
        assert_eq!(
            fixture.writer().expect("Journal closed").last_index(),
            0,
            "Model needs an empty journal"
        );
        Self {
            fixture,
            expected: Vec::new(),
            committed: 0,
        }
    }

    /// Returns the journal under test.
    pub fn fixture(&self) -> &TempJournal {
        &self.fixture
    }

    /// Returns the entries the model expects, starting at index 1.
    pub fn expected(&self) -> &[Vec<u8>] {
        &self.expected
    }

    fn last_index(&self) -> u64 {
        self.expected.len() as u64
    }

    /// Number of entries from the journal's first index to its last.
    fn live(&self) -> u64 {
        self.last_index() + 1 - self.fixture.first_index()
    }

    /// Applies `operation` to both the journal and the model.
    pub fn apply(&mut self, operation: &Operation) {
        let first = self.fixture.first_index();
        let live = self.live();
        let mut writer = self.fixture.writer().expect("Journal closed");

        match operation {
            Operation::Append(entry) => {
                let indexed = writer.append(entry.clone()).expect("Append failed");
                assert_eq!(indexed.index(), self.last_index() + 1);
                self.expected.push(entry.clone());
            }
            Operation::Truncate(share) => {
                let index = first - 1 + live * u64::from(*share) / 100;
                writer.truncate(index).expect("Truncate failed");
                self.expected.truncate(index as usize);
            }
            Operation::Overwrite(share, entry) => {
                if live == 0 {
                    return;
                }
                let index = first + (live - 1) * u64::from(*share) / 100;
                let indexed = writer
                    .append_indexed(Indexed::new(index, entry.clone(), entry.len() as u32))
                    .expect("Overwrite failed");
                assert_eq!(indexed.index(), index);
                self.expected.truncate(index as usize - 1);
                self.expected.push(entry.clone());
            }
            Operation::Commit => {
                writer.commit(self.last_index()).expect("Commit failed");
                self.committed = self.committed.max(self.last_index());
            }
            Operation::Compact(share) => {
                drop(writer);
                let index = first + live * u64::from(*share) / 100;
                self.fixture.compact(index).expect("Compact failed");
            }
            Operation::Flush => {
                writer.flush().expect("Flush failed");
            }
        }
    }

    /// Checks the journal against the model.
    pub fn verify(&self) {
        let first = self.fixture.first_index();
        assert!(first >= 1);
        assert!(first - 1 <= self.last_index(), "Compaction ran past the log end");

        let next = self.fixture.writer().expect("Journal closed").next_index();
        assert_eq!(next, self.last_index() + 1);
        assert_eq!(self.fixture.commit_index(), self.committed);

        let actual = self.fixture.read_from(first);
        let expected: Vec<(u64, Vec<u8>)> = self.expected[first as usize - 1..]
            .iter()
            .cloned()
            .enumerate()
            .map(|(offset, entry)| (first + offset as u64, entry))
            .collect();
        assert_eq!(actual, expected);
    }
}
