use std::{
    marker::PhantomData,
    ops::{Bound, RangeBounds},
    sync::Arc,
};

use sled::{IVec, Iter, Tree, transaction::TransactionalTree};

use crate::{KeyCodec, Schema, ValueCodec, error::Result};

/// Decodes a raw key-value pair into typed schema types.
fn decode_pair<S: Schema>((k, v): (IVec, IVec)) -> Result<(S::Key, S::Value)> {
    let key = S::Key::decode_key(&k)?;
    let value = S::Value::decode_value(&v)?;
    Ok((key, value))
}

/// Converts a typed key bound to a raw byte bound.
fn key_bound<S: Schema>(k: Bound<&S::Key>) -> Result<Bound<Vec<u8>>> {
    let bound = match k {
        Bound::Included(k) => Bound::Included(k.encode_key()?),
        Bound::Excluded(k) => Bound::Excluded(k.encode_key()?),
        Bound::Unbounded => Bound::Unbounded,
    };
    Ok(bound)
}

/// Type-safe wrapper around a sled tree with schema-enforced operations.
#[derive(Debug)]
pub struct SledTree<S: Schema> {
    pub(crate) inner: Arc<Tree>,
    _phantom: PhantomData<S>,
}

impl<S: Schema> SledTree<S> {
    /// Creates a new typed tree wrapper.
    pub fn new(inner: Arc<Tree>) -> Self {
        Self {
            inner,
            _phantom: PhantomData,
        }
    }

    /// Inserts a key-value pair into the tree.
    pub fn insert(&self, key: &S::Key, value: &S::Value) -> Result<()> {
        let key = key.encode_key()?;
        let value = value.encode_value()?;
        self.inner.insert(key, value)?;

        self.inner.flush()?;
        Ok(())
    }

    /// Retrieves a value for the given key.
    pub fn get(&self, key: &S::Key) -> Result<Option<S::Value>> {
        let key = key.encode_key()?;
        let val = self.inner.get(key)?;
        let val = val.as_deref();
        Ok(val.map(|v| S::Value::decode_value(v)).transpose()?)
    }

    /// Returns true if the tree holds a value for the given key.
    pub fn contains_key(&self, key: &S::Key) -> Result<bool> {
        let key = key.encode_key()?;
        Ok(self.inner.contains_key(key)?)
    }

    /// Removes a key-value pair from the tree.
    pub fn remove(&self, key: &S::Key) -> Result<()> {
        let key = key.encode_key()?;
        self.inner.remove(key)?;

        self.inner.flush()?;
        Ok(())
    }

    /// Returns true if the tree contains no key-value pairs.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the first key-value pair in the tree.
    pub fn first(&self) -> Result<Option<(S::Key, S::Value)>> {
        self.inner.first()?.map(decode_pair::<S>).transpose()
    }

    /// Returns the last key-value pair in the tree.
    pub fn last(&self) -> Result<Option<(S::Key, S::Value)>> {
        self.inner.last()?.map(decode_pair::<S>).transpose()
    }

    /// Returns an iterator over all key-value pairs in the tree.
    pub fn iter(&self) -> SledTreeIter<S> {
        SledTreeIter {
            inner: self.inner.iter(),
            _phantom: PhantomData,
        }
    }

    /// Returns an iterator over key-value pairs within the specified range.
    pub fn range<R>(&self, range: R) -> Result<SledTreeIter<S>>
    where
        R: RangeBounds<S::Key>,
    {
        let start = key_bound::<S>(range.start_bound())?;
        let end = key_bound::<S>(range.end_bound())?;
        Ok(SledTreeIter {
            inner: self.inner.range((start, end)),
            _phantom: PhantomData,
        })
    }
}

/// Type-safe wrapper around sled's transactional tree.
pub struct SledTransactionalTree<S: Schema> {
    inner: TransactionalTree,
    _phantom: PhantomData<S>,
}

impl<S: Schema> SledTransactionalTree<S> {
    /// Creates a new transactional tree wrapper.
    pub fn new(inner: TransactionalTree) -> Self {
        Self {
            inner,
            _phantom: PhantomData,
        }
    }

    /// Inserts a key-value pair in the transaction.
    pub fn insert(&self, key: &S::Key, value: &S::Value) -> Result<()> {
        let key = key.encode_key()?;
        let value = value.encode_value()?;
        self.inner.insert(key, value)?;
        Ok(())
    }

    /// Retrieves a value for the given key within the transaction.
    pub fn get(&self, key: &S::Key) -> Result<Option<S::Value>> {
        let key = key.encode_key()?;
        let val = self.inner.get(key)?;
        let val = val.as_deref();
        Ok(val.map(|v| S::Value::decode_value(v)).transpose()?)
    }

    /// Removes a key-value pair within the transaction.
    pub fn remove(&self, key: &S::Key) -> Result<()> {
        let key = key.encode_key()?;
        self.inner.remove(key)?;
        Ok(())
    }
}

/// A typed iterator over key-value pairs in a sled tree.
pub struct SledTreeIter<S: Schema> {
    inner: Iter,
    _phantom: PhantomData<S>,
}

impl<S: Schema> Iterator for SledTreeIter<S> {
    type Item = Result<(S::Key, S::Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|result| result.map_err(Into::into).and_then(decode_pair::<S>))
    }
}

impl<S: Schema> DoubleEndedIterator for SledTreeIter<S> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner
            .next_back()
            .map(|result| result.map_err(Into::into).and_then(decode_pair::<S>))
    }
}
