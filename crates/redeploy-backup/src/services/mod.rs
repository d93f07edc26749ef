mod backup;

pub use backup::{BackupError, BackupManager, BackupRecord, BACKUP_DIR_NAME};
