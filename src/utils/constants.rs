/// Apps Script deployment used when GOOGLE_SCRIPT_URL is not configured
pub const DEFAULT_GOOGLE_SCRIPT_URL: &str = "https://script.google.com/macros/s/CONFIGURE_ME/exec";

pub const DEFAULT_FIRESTORE_PROJECT_ID: &str = "chineseclass-cache";

/// localStorage key of the timestamped data backup
pub const LOCAL_BACKUP_KEY: &str = "wany_data_backup";

/// localStorage key of the pending write queue
pub const PENDING_QUEUE_KEY: &str = "wany_pending_writes";

/// Action name that bypasses the write queue
pub const LOGIN_ACTION: &str = "login";

/// Collections the classroom data is made of
pub const COLLECTIONS: [&str; 10] = [
    "subjects",
    "classes",
    "students",
    "tasks",
    "scores",
    "attendance",
    "materials",
    "submissions",
    "returns",
    "schedules",
];

/// Status element ids updated by the DOM status reporter
pub const STATUS_ELEMENT_SELECTOR: &str = "#sync-status, #sync-status-scan";
pub const STATUS_ICON_SELECTOR: &str = ".fa-wifi, .fa-spinner";
