use std::fmt::{self, Debug};

use crate::codec::{KeyCodec, ValueCodec};

/// Name of a sled tree, kept as a distinct type so tree handles cannot
/// be looked up with arbitrary strings.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct TreeName(pub &'static str);

impl TreeName {
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl From<&'static str> for TreeName {
    fn from(value: &'static str) -> Self {
        Self(value)
    }
}

impl fmt::Display for TreeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A table definition: a named sled tree with typed keys and values.
///
/// The codec associated types fix the on-disk format per tree, so a key
/// or value type change surfaces as a compile error instead of silent
/// corruption.
pub trait Schema: Debug + Send + Sync + Sized {
    const TREE_NAME: TreeName;

    type Key: KeyCodec<Self>;
    type Value: ValueCodec<Self>;
}
