use crate::commitlog::{Entry, EntryDecodeError, Index, Log};
use std::convert::TryFrom;
use std::io;
use std::marker::PhantomData;

// Models a durable log in RAM. Entries are held as bytes to exercise the entry codec.
pub struct InMemoryLog<E: Entry> {
    log: Vec<Vec<u8>>,
    // Index of `log[0]`. Moves forward on compaction and reset.
    first_index: Index,
    _pd: PhantomData<E>,
}

impl<E: Entry> InMemoryLog<E> {
    pub fn create() -> Result<Self, io::Error> {
        Ok(InMemoryLog {
            log: vec![],
            first_index: Index::start_index(),
            _pd: PhantomData::default(),
        })
    }

    fn vec_index(&self, index: Index) -> Option<usize> {
        if index < self.first_index {
            None
        } else {
            Some((index.as_u64() - self.first_index.as_u64()) as usize)
        }
    }

    fn decode(bytes: Vec<u8>) -> Result<E, io::Error> {
        E::try_from(bytes).map_err(|EntryDecodeError(msg)| io::Error::new(io::ErrorKind::InvalidData, msg))
    }
}

impl<E: Entry> Log<E> for InMemoryLog<E> {
    fn append(&mut self, entry: E) -> Result<Index, io::Error> {
        self.log.push(entry.into());

        Ok(self.next_index().minus(1))
    }

    fn read(&self, index: Index) -> Result<Option<E>, io::Error> {
        match self.vec_index(index).and_then(|i| self.log.get(i)) {
            Some(bytes) => Self::decode(bytes.clone()).map(Some),
            None => Ok(None),
        }
    }

    fn truncate(&mut self, index: Index) {
        match self.vec_index(index) {
            Some(vec_index) => self.log.truncate(vec_index),
            None => self.log.clear(),
        }
    }

    fn next_index(&self) -> Index {
        self.first_index.plus(self.log.len() as u64)
    }

    fn first_index(&self) -> Index {
        self.first_index
    }

    fn compact_before(&mut self, index: Index) {
        if index <= self.first_index {
            return;
        }
        if index >= self.next_index() {
            self.reset(index);
            return;
        }

        let num_to_drop = (index.as_u64() - self.first_index.as_u64()) as usize;
        self.log.drain(..num_to_drop);
        self.first_index = index;
    }

    fn reset(&mut self, next_index: Index) {
        self.log.clear();
        self.first_index = next_index;
    }
}
