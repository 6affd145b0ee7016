//! Serialization of the record page.

use crate::errors::page_error::PageResult;
use crate::errors::parse_error::PageParseError;
use crate::record_page::RecordPage;
use crate::record_page::header::RecordPageHeader;
use crate::record_slot::RecordSlot;
use binary_helpers::cursor::{ByteReader, ByteWriter};
use std::collections::HashMap;

/// Decodes a page from its byte image. The image length is the page size.
pub(crate) fn load(bytes: &[u8]) -> PageResult<RecordPage> {
    let page_size = bytes.len();
    let mut reader = ByteReader::new(bytes);
    let header = RecordPageHeader::load_from(&mut reader, page_size)?;

    let mut slots = HashMap::with_capacity(header.spans.len());
    for (slot_id, span) in &header.spans {
        let image = &bytes[span.offset..span.offset + span.size];
        slots.insert(*slot_id, RecordSlot::load(image)?);
    }

    Ok(RecordPage { header, slots })
}

/// Encodes `page` into `output`: header first, zeroed free space, then the
/// slot payloads at the offsets recorded in the header.
pub(crate) fn dump(page: &RecordPage, output: &mut [u8]) -> PageResult<()> {
    let page_size = page.header.page_size;
    if output.len() != page_size {
        return Err(PageParseError::Truncated {
            needed: page_size,
            available: output.len(),
        }
        .into());
    }

    {
        let mut writer = ByteWriter::new(&mut *output);
        page.header.dump_into(&mut writer)?;
        writer
            .fill_zero(page.header.tail() - page.header.storage_size())
            .map_err(PageParseError::Binary)?;
    }

    for (slot_id, span) in &page.header.spans {
        let image = &mut output[span.offset..span.offset + span.size];
        page.slots[slot_id].dump(image)?;
    }
    Ok(())
}

#[cfg(test)]
mod codec_tests {
    use super::*;
    use crate::errors::page_error::PageError;
    use crate::page::{DEFAULT_PAGE_SIZE, Page};
    use crate::record_page::test_support::RecordingJournal;

    fn populated_page() -> RecordPage {
        let mut page = RecordPage::with_size(3, DEFAULT_PAGE_SIZE);
        let mut journal = RecordingJournal::default();
        page.insert_slot(RecordSlot::new(b"alpha".to_vec()), &mut journal)
            .unwrap();
        page.insert_slot(RecordSlot::new(b"beta".to_vec()), &mut journal)
            .unwrap();
        let mut linked = RecordSlot::new(b"gamma".to_vec());
        linked.next_location = crate::location::RecordLocation::new(9, 1);
        page.insert_slot(linked, &mut journal).unwrap();
        page.set_next_page_id(4);
        page
    }

    #[test]
    fn empty_page_round_trips() {
        let page = RecordPage::with_size(1, DEFAULT_PAGE_SIZE);
        let mut bytes = vec![0u8; DEFAULT_PAGE_SIZE];
        page.dump(&mut bytes).unwrap();
        assert_eq!(RecordPage::load(&bytes).unwrap(), page);
    }

    #[test]
    fn populated_page_round_trips() {
        let page = populated_page();
        let mut bytes = vec![0u8; DEFAULT_PAGE_SIZE];
        page.dump(&mut bytes).unwrap();
        let loaded = RecordPage::load(&bytes).unwrap();
        assert_eq!(loaded, page);
        assert_eq!(loaded.slot(3).unwrap().data, b"gamma");
    }

    #[test]
    fn free_region_is_zero_filled() {
        let page = populated_page();
        let mut bytes = vec![0xAAu8; DEFAULT_PAGE_SIZE];
        page.dump(&mut bytes).unwrap();
        let free = &bytes[page.header.storage_size()..page.header.tail()];
        assert!(free.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn dump_rejects_wrong_buffer_size() {
        let page = populated_page();
        let mut bytes = vec![0u8; DEFAULT_PAGE_SIZE - 1];
        assert!(matches!(
            page.dump(&mut bytes),
            Err(PageError::Parse(PageParseError::Truncated { .. }))
        ));
    }

    #[test]
    fn corrupted_header_is_rejected() {
        let page = populated_page();
        let mut bytes = vec![0u8; DEFAULT_PAGE_SIZE];
        page.dump(&mut bytes).unwrap();
        bytes[0] ^= 0x01;
        assert!(matches!(
            RecordPage::load(&bytes),
            Err(PageError::Corrupt(_))
        ));
    }

    #[test]
    fn corrupted_slot_payload_is_rejected() {
        let page = populated_page();
        let mut bytes = vec![0u8; DEFAULT_PAGE_SIZE];
        page.dump(&mut bytes).unwrap();
        let tail = page.header.tail();
        bytes[tail + RecordSlot::FIXED_STORAGE_SIZE - 2] ^= 0xFF;
        assert!(matches!(
            RecordPage::load(&bytes),
            Err(PageError::Corrupt(_))
        ));
    }
}
