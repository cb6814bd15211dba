use std::{fs, path::Path, sync::Arc};

use anyhow::Context;
use typed_sled::SledDb;

use crate::{SledDbConfig, TaskDBSled};

/// Opens the task database under `datadir/sled/<dbname>`, creating the
/// directory tree if needed.
pub fn open_task_database(
    datadir: &Path,
    dbname: &'static str,
    config: SledDbConfig,
) -> anyhow::Result<Arc<TaskDBSled>> {
    let mut database_dir = datadir.to_path_buf();
    database_dir.push("sled");
    database_dir.push(dbname);

    if !database_dir.exists() {
        fs::create_dir_all(&database_dir)?;
    }

    let sled_db = sled::open(&database_dir).context("opening sled database")?;
    let db = SledDb::new(Arc::new(sled_db))
        .map_err(|e| anyhow::anyhow!("failed to create sled db: {e}"))?;

    let task_db = TaskDBSled::new(Arc::new(db), config)
        .map_err(|e| anyhow::anyhow!("failed to initialize task database: {e}"))?;
    Ok(Arc::new(task_db))
}
