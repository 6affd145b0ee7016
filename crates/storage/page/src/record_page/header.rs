//! Record page header and the slot span arithmetic.

use crate::errors::page_error::PageResult;
use crate::errors::parse_error::{PageCorruptError, PageParseError};
use crate::location::{PageId, SlotId};
use binary_helpers::checksum::checksum;
use binary_helpers::cursor::{ByteReader, ByteWriter};
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

/// Offset and size of one stored slot, measured from the page start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotSpan {
    pub(crate) offset: usize,
    pub(crate) size: usize,
}

/// The page header: identity, overflow links and the ordered span map.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RecordPageHeader {
    pub(crate) page_id: PageId,
    pub(crate) prev_page_id: PageId,
    pub(crate) next_page_id: PageId,
    /// Size negotiated at storage open. Not serialized; the byte image
    /// length carries it.
    pub(crate) page_size: usize,
    /// Span of every live slot, keyed by slot id. Offsets are strictly
    /// decreasing in key order.
    pub(crate) spans: BTreeMap<SlotId, SlotSpan>,
}

impl RecordPageHeader {
    /// page_id + prev_page_id + next_page_id + slot_count + checksum.
    pub(crate) const FIXED_STORAGE_SIZE: usize = 4 * 8 + 4;

    /// slot_id + offset + size.
    pub(crate) const SPAN_ENTRY_SIZE: usize = 3 * 8;

    pub(crate) fn new(page_id: PageId, page_size: usize) -> Self {
        Self {
            page_id,
            prev_page_id: 0,
            next_page_id: 0,
            page_size,
            spans: BTreeMap::new(),
        }
    }

    /// Serialized size of the header.
    pub(crate) fn storage_size(&self) -> usize {
        Self::FIXED_STORAGE_SIZE + self.spans.len() * Self::SPAN_ENTRY_SIZE
    }

    /// Ending offset of the free space: the lowest slot offset, or the
    /// page end when no slots are stored.
    pub(crate) fn tail(&self) -> usize {
        self.spans
            .last_key_value()
            .map(|(_, span)| span.offset)
            .unwrap_or(self.page_size)
    }

    /// The id the next inserted slot will receive.
    pub(crate) fn next_slot_id(&self) -> SlotId {
        self.spans.last_key_value().map(|(id, _)| id + 1).unwrap_or(1)
    }

    /// Appends a span of `size` bytes at the tail for `slot_id`, which must
    /// be the id returned by [`Self::next_slot_id`].
    pub(crate) fn push_slot(&mut self, slot_id: SlotId, size: usize) {
        debug_assert_eq!(slot_id, self.next_slot_id());
        let offset = self.tail() - size;
        self.spans.insert(slot_id, SlotSpan { offset, size });
    }

    /// Re-creates a span for a previously freed `slot_id`, shifting every
    /// higher slot down to make room. Used by undo.
    pub(crate) fn create_slot_at(&mut self, slot_id: SlotId, size: usize) {
        let prev_offset = self
            .spans
            .range(..slot_id)
            .next_back()
            .map(|(_, span)| span.offset)
            .unwrap_or(self.page_size);
        for span in self
            .spans
            .range_mut((Excluded(slot_id), Unbounded))
            .map(|(_, span)| span)
        {
            span.offset -= size;
        }
        self.spans.insert(
            slot_id,
            SlotSpan {
                offset: prev_offset - size,
                size,
            },
        );
    }

    /// Resizes the span of `slot_id`, shifting it and every higher slot by
    /// the size delta.
    pub(crate) fn update_slot(&mut self, slot_id: SlotId, new_size: usize) {
        let old_size = self.spans[&slot_id].size;
        let delta = old_size as i64 - new_size as i64;
        for span in self.spans.range_mut(slot_id..).map(|(_, span)| span) {
            span.offset = (span.offset as i64 + delta) as usize;
        }
        if let Some(span) = self.spans.get_mut(&slot_id) {
            span.size = new_size;
        }
    }

    /// Frees the span of `slot_id`, shifting every higher slot up to close
    /// the gap.
    pub(crate) fn free_slot(&mut self, slot_id: SlotId) {
        let freed = self.spans[&slot_id].size;
        self.spans.remove(&slot_id);
        for span in self
            .spans
            .range_mut((Excluded(slot_id), Unbounded))
            .map(|(_, span)| span)
        {
            span.offset += freed;
        }
    }

    /// Decodes the header from the start of a page image of `page_size`
    /// bytes.
    pub(crate) fn load_from(reader: &mut ByteReader<'_>, page_size: usize) -> PageResult<Self> {
        let start = reader.position();
        let page_id = reader.read::<u64>().map_err(PageParseError::Binary)?;
        let prev_page_id = reader.read::<u64>().map_err(PageParseError::Binary)?;
        let next_page_id = reader.read::<u64>().map_err(PageParseError::Binary)?;
        let slot_count = reader.read::<u64>().map_err(PageParseError::Binary)?;

        // Reject images whose slot count could not fit in the header
        // region before attempting to read that many entries.
        let header_size =
            Self::FIXED_STORAGE_SIZE as u64 + slot_count * Self::SPAN_ENTRY_SIZE as u64;
        if header_size > page_size as u64 {
            return Err(PageParseError::SlotCountOverflow {
                slot_count,
                page_size,
            }
            .into());
        }

        let mut spans = BTreeMap::new();
        for _ in 0..slot_count {
            let slot_id = reader.read::<u64>().map_err(PageParseError::Binary)?;
            let offset = reader.read::<u64>().map_err(PageParseError::Binary)?;
            let size = reader.read::<u64>().map_err(PageParseError::Binary)?;
            if offset + size > page_size as u64 {
                return Err(PageParseError::SpanOutOfBounds {
                    offset,
                    size,
                    page_size,
                }
                .into());
            }
            spans.insert(
                slot_id,
                SlotSpan {
                    offset: offset as usize,
                    size: size as usize,
                },
            );
        }

        let covered = reader.span_since(start);
        let stored = reader.read::<u32>().map_err(PageParseError::Binary)?;
        PageCorruptError::verify(covered, stored)?;

        Ok(Self {
            page_id,
            prev_page_id,
            next_page_id,
            page_size,
            spans,
        })
    }

    /// Encodes the header at the writer's current position.
    pub(crate) fn dump_into(&self, writer: &mut ByteWriter<'_>) -> PageResult<()> {
        let start = writer.position();
        writer.write::<u64>(self.page_id).map_err(PageParseError::Binary)?;
        writer
            .write::<u64>(self.prev_page_id)
            .map_err(PageParseError::Binary)?;
        writer
            .write::<u64>(self.next_page_id)
            .map_err(PageParseError::Binary)?;
        writer
            .write::<u64>(self.spans.len() as u64)
            .map_err(PageParseError::Binary)?;
        for (slot_id, span) in &self.spans {
            writer.write::<u64>(*slot_id).map_err(PageParseError::Binary)?;
            writer
                .write::<u64>(span.offset as u64)
                .map_err(PageParseError::Binary)?;
            writer
                .write::<u64>(span.size as u64)
                .map_err(PageParseError::Binary)?;
        }
        let crc = checksum(writer.span_since(start));
        writer.write::<u32>(crc).map_err(PageParseError::Binary)?;
        Ok(())
    }
}

#[cfg(test)]
mod header_tests {
    use super::*;

    fn header_with_slots(sizes: &[usize]) -> RecordPageHeader {
        let mut header = RecordPageHeader::new(1, 1024);
        for size in sizes {
            let slot_id = header.next_slot_id();
            header.push_slot(slot_id, *size);
        }
        header
    }

    #[test]
    fn tail_of_empty_header_is_page_size() {
        let header = RecordPageHeader::new(1, 1024);
        assert_eq!(header.tail(), 1024);
        assert_eq!(header.next_slot_id(), 1);
    }

    #[test]
    fn push_slot_packs_from_the_tail() {
        let header = header_with_slots(&[100, 50, 25]);
        assert_eq!(header.spans[&1].offset, 924);
        assert_eq!(header.spans[&2].offset, 874);
        assert_eq!(header.spans[&3].offset, 849);
        assert_eq!(header.tail(), 849);
    }

    #[test]
    fn offsets_strictly_decrease_in_slot_id_order() {
        let header = header_with_slots(&[10, 20, 30, 40]);
        let offsets: Vec<usize> = header.spans.values().map(|span| span.offset).collect();
        assert!(offsets.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn update_slot_shifts_self_and_higher_slots() {
        let mut header = header_with_slots(&[100, 50, 25]);
        // Grow slot 2 by 10 bytes.
        header.update_slot(2, 60);
        assert_eq!(header.spans[&1].offset, 924);
        assert_eq!(header.spans[&2].offset, 864);
        assert_eq!(header.spans[&2].size, 60);
        assert_eq!(header.spans[&3].offset, 839);
    }

    #[test]
    fn update_slot_shrinking_moves_higher_slots_up() {
        let mut header = header_with_slots(&[100, 50, 25]);
        header.update_slot(2, 30);
        assert_eq!(header.spans[&2].offset, 894);
        assert_eq!(header.spans[&3].offset, 869);
    }

    #[test]
    fn free_slot_closes_the_gap() {
        let mut header = header_with_slots(&[100, 50, 25]);
        header.free_slot(2);
        assert!(!header.spans.contains_key(&2));
        assert_eq!(header.spans[&1].offset, 924);
        assert_eq!(header.spans[&3].offset, 899);
        // The freed id is not reused for fresh inserts.
        assert_eq!(header.next_slot_id(), 4);
    }

    #[test]
    fn create_slot_at_restores_a_freed_span() {
        let mut header = header_with_slots(&[100, 50, 25]);
        let original = header.spans.clone();
        header.free_slot(2);
        header.create_slot_at(2, 50);
        assert_eq!(header.spans, original);
    }

    #[test]
    fn create_slot_at_start_of_page_uses_page_end() {
        let mut header = header_with_slots(&[100, 50]);
        header.free_slot(1);
        header.create_slot_at(1, 100);
        assert_eq!(header.spans[&1].offset, 924);
        assert_eq!(header.spans[&2].offset, 874);
    }

    #[test]
    fn header_round_trips() {
        let header = header_with_slots(&[100, 50, 25]);
        let mut bytes = vec![0u8; header.storage_size()];
        header.dump_into(&mut ByteWriter::new(&mut bytes)).unwrap();
        let loaded =
            RecordPageHeader::load_from(&mut ByteReader::new(&bytes), header.page_size).unwrap();
        assert_eq!(loaded, header);
    }

    #[test]
    fn load_rejects_impossible_slot_count() {
        let header = RecordPageHeader::new(1, 512);
        let mut bytes = vec![0u8; 64];
        header.dump_into(&mut ByteWriter::new(&mut bytes)).unwrap();
        // Corrupt the slot count field to a value the header region could
        // never hold.
        bytes[24] = 0xFF;
        bytes[25] = 0xFF;
        let result = RecordPageHeader::load_from(&mut ByteReader::new(&bytes), 512);
        assert!(matches!(
            result,
            Err(crate::errors::page_error::PageError::Parse(
                PageParseError::SlotCountOverflow { .. }
            ))
        ));
    }
}
