// ============================================================================
// STATE MODULE - Rc<RefCell> state shared with the UI
// ============================================================================

pub mod sync_state;

pub use sync_state::*;
