pub mod data_state;
pub mod sheet;
pub mod sync;

pub use data_state::DataState;
pub use sheet::{parse_sheet_response, parse_write_response, SheetPayload};
pub use sync::{
    DrainReport, LocalBackup, PendingWrite, PendingWritesQueue, StatusColor, SubmitOutcome,
    SyncOutcome, SyncStatus, WriteKind,
};
