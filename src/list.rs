//! A doubly-linked list collection stored as records.
//!
//! Each element is a node record carrying the locations of its neighbors
//! and the element payload. The collection must be opened before use;
//! operations on a closed collection fail with
//! [`Error::CollectionNotOpen`].

use crate::errors::Error;
use crate::store::Store;
use binary_helpers::cursor::{ByteReader, ByteWriter};
use page::location::RecordLocation;
use txn::transaction::Transaction;

/// One stored element: neighbor links plus the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Node {
    next: RecordLocation,
    prev: RecordLocation,
    payload: Vec<u8>,
}

impl Node {
    fn storage_size(&self) -> usize {
        2 * 16 + self.payload.len()
    }

    fn dump(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = vec![0u8; self.storage_size()];
        let mut writer = ByteWriter::new(&mut bytes);
        self.next.write_to(&mut writer)?;
        self.prev.write_to(&mut writer)?;
        writer.write_bytes(&self.payload)?;
        Ok(bytes)
    }

    fn load(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = ByteReader::new(bytes);
        let next = RecordLocation::read_from(&mut reader)?;
        let prev = RecordLocation::read_from(&mut reader)?;
        let payload = reader.read_exact(reader.remaining())?.to_vec();
        Ok(Self {
            next,
            prev,
            payload,
        })
    }
}

/// A doubly-linked list of byte payloads persisted through a [`Store`].
#[derive(Debug)]
pub struct List<'s> {
    store: &'s Store,
    head: RecordLocation,
    tail: RecordLocation,
    opened: bool,
}

impl<'s> List<'s> {
    /// Creates a closed, empty list over the store.
    pub fn new(store: &'s Store) -> Self {
        Self {
            store,
            head: RecordLocation::NULL,
            tail: RecordLocation::NULL,
            opened: false,
        }
    }

    /// Creates a list resuming from a known head element, e.g. one kept
    /// from a previous session.
    pub fn with_head(store: &'s Store, txn: &Transaction, head: RecordLocation) -> Result<Self, Error> {
        let mut list = Self::new(store);
        list.opened = true;
        list.head = head;
        // Walk to the tail so appends keep working.
        let mut location = head;
        while !location.is_null() {
            list.tail = location;
            location = list.node(txn, location)?.next;
        }
        Ok(list)
    }

    pub fn open(&mut self) {
        self.opened = true;
    }

    pub fn close(&mut self) {
        self.opened = false;
    }

    /// Location of the first element, null while the list is empty.
    pub fn head(&self) -> RecordLocation {
        self.head
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.opened {
            Ok(())
        } else {
            Err(Error::CollectionNotOpen)
        }
    }

    fn node(&self, txn: &Transaction, location: RecordLocation) -> Result<Node, Error> {
        Node::load(&self.store.read(txn, location)?)
    }

    /// Appends an element and returns its location.
    pub fn push_back(
        &mut self,
        txn: &mut Transaction,
        payload: &[u8],
    ) -> Result<RecordLocation, Error> {
        self.ensure_open()?;
        let node = Node {
            next: RecordLocation::NULL,
            prev: self.tail,
            payload: payload.to_vec(),
        };
        let location = self.store.insert(txn, &node.dump()?)?;

        if self.tail.is_null() {
            self.head = location;
        } else {
            let mut tail_node = self.node(txn, self.tail)?;
            tail_node.next = location;
            self.store.update(txn, self.tail, &tail_node.dump()?)?;
        }
        self.tail = location;
        Ok(location)
    }

    /// Returns the payload of the element at `location`.
    pub fn get(&self, txn: &Transaction, location: RecordLocation) -> Result<Vec<u8>, Error> {
        self.ensure_open()?;
        Ok(self.node(txn, location)?.payload)
    }

    /// Removes the element at `location`, relinking its neighbors.
    pub fn remove(
        &mut self,
        txn: &mut Transaction,
        location: RecordLocation,
    ) -> Result<(), Error> {
        self.ensure_open()?;
        let node = self.node(txn, location)?;

        if node.prev.is_null() {
            self.head = node.next;
        } else {
            let mut prev_node = self.node(txn, node.prev)?;
            prev_node.next = node.next;
            self.store.update(txn, node.prev, &prev_node.dump()?)?;
        }
        if node.next.is_null() {
            self.tail = node.prev;
        } else {
            let mut next_node = self.node(txn, node.next)?;
            next_node.prev = node.prev;
            self.store.update(txn, node.next, &next_node.dump()?)?;
        }
        self.store.remove(txn, location)?;
        Ok(())
    }

    /// Iterates the payloads from the first element onward.
    pub fn iter<'t>(&'t self, txn: &'t Transaction) -> ListIter<'t, 's> {
        ListIter {
            list: self,
            txn,
            current: self.head,
        }
    }
}

/// Forward iterator over a [`List`].
#[derive(Debug)]
pub struct ListIter<'t, 's> {
    list: &'t List<'s>,
    txn: &'t Transaction,
    current: RecordLocation,
}

impl Iterator for ListIter<'_, '_> {
    type Item = Result<Vec<u8>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_null() {
            return None;
        }
        match self.list.node(self.txn, self.current) {
            Ok(node) => {
                self.current = node.next;
                Some(Ok(node.payload))
            }
            Err(error) => {
                self.current = RecordLocation::NULL;
                Some(Err(error))
            }
        }
    }
}
