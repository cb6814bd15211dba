use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use sled::{Db, Tree};

use crate::{
    error::Result,
    schema::{Schema, TreeName},
    tree::SledTree,
};

/// Registry of typed trees over one sled database.
///
/// Trees are opened lazily on first access and cached, so repeated
/// `get_tree` calls for the same schema are cheap and hand out handles
/// to the same underlying tree.
#[derive(Debug)]
pub struct SledDb {
    trees: DashMap<TreeName, Arc<Tree>>,
    db: Arc<Db>,
}

impl SledDb {
    pub fn new(db: Arc<Db>) -> Result<Self> {
        Ok(Self {
            trees: DashMap::new(),
            db,
        })
    }

    /// Returns the typed handle for the schema's tree, opening it on
    /// first use.
    pub fn get_tree<S: Schema>(&self) -> Result<SledTree<S>> {
        let tree = match self.trees.entry(S::TREE_NAME) {
            Entry::Occupied(occupied) => occupied.get().clone(),
            Entry::Vacant(vacant) => {
                let opened = Arc::new(self.db.open_tree(S::TREE_NAME.as_str())?);
                vacant.insert(opened.clone());
                opened
            }
        };
        Ok(SledTree::new(tree))
    }
}
