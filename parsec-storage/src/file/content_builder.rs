//! Coalesces a sequence of pending writes/truncates into the minimal set of
//! non-overlapping `(offset, bytes)` runs, grounded line-for-line on
//! `ContentBuilder` in `examples/original_source/parsec/core/file.py`.
//!
//! The original walks a plain `dict`, whose iteration order is
//! insertion-order in the CPython version this was written against; this
//! port uses a `BTreeMap` and walks entries in offset order instead, which
//! is deterministic and processes overlaps left-to-right regardless of the
//! order `write()` was called in.

use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct ContentBuilder {
    contents: BTreeMap<u64, Vec<u8>>,
}

impl ContentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-overlapping `(offset, bytes)` runs accumulated so far, in
    /// ascending offset order.
    pub fn contents(&self) -> &BTreeMap<u64, Vec<u8>> {
        &self.contents
    }

    pub fn write(&mut self, data: &[u8], mut offset: u64) {
        let end_offset = offset + data.len() as u64;
        let mut offsets_to_delete = Vec::new();
        let mut new_data = data.to_vec();

        let existing: Vec<(u64, Vec<u8>)> = self.contents.iter().map(|(o, c)| (*o, c.clone())).collect();

        for (current_offset, current_content) in existing {
            let current_len = current_content.len() as u64;

            if offset >= current_offset && end_offset <= current_offset + current_len {
                // The new write lands entirely inside an existing run.
                let head_end = (offset - current_offset) as usize;
                let tail_start = head_end + data.len();
                let mut merged = current_content[..head_end].to_vec();
                merged.extend_from_slice(data);
                merged.extend_from_slice(&current_content[tail_start.min(current_content.len())..]);
                new_data = merged;
                offset = current_offset;
            } else if offset <= current_offset && end_offset >= current_offset {
                // The new write starts at or before an existing run and
                // reaches into it (or past its start): merge, keeping
                // whatever tail of the old run falls beyond the new data.
                let tail_start = (offset + data.len() as u64 - current_offset) as usize;
                let mut merged = data.to_vec();
                merged.extend_from_slice(&current_content[tail_start.min(current_content.len())..]);
                new_data = merged;
                offsets_to_delete.push(current_offset);
            } else if offset == current_offset + current_len {
                // The new write starts exactly where an existing run ends.
                let mut merged = current_content;
                merged.extend_from_slice(&new_data);
                new_data = merged;
                offset = current_offset;
            }
        }

        for o in offsets_to_delete {
            self.contents.remove(&o);
        }
        self.contents.insert(offset, new_data);
    }

    pub fn truncate(&mut self, length: u64) {
        let mut offsets_to_delete = Vec::new();
        let mut updates = Vec::new();

        for (&current_offset, content) in self.contents.iter() {
            if current_offset > length {
                offsets_to_delete.push(current_offset);
            } else if current_offset + content.len() as u64 > length {
                let keep = (length - current_offset) as usize;
                updates.push((current_offset, content[..keep].to_vec()));
            }
        }

        for (o, c) in updates {
            self.contents.insert(o, c);
        }
        for o in offsets_to_delete {
            self.contents.remove(&o);
        }
    }
}
