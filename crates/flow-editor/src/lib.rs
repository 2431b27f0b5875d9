pub mod commands;
pub mod connect;
pub mod edit;
pub mod input;
pub mod session;
pub mod shortcuts;
pub mod tools;
pub mod viewport;

pub use commands::CommandStack;
pub use connect::{ConnectionOutcome, ConnectionState, ConnectionStateMachine};
pub use edit::{EditEngine, FlowMutation};
pub use input::{InputEvent, Modifiers};
pub use session::{EditorSession, HostRequest, Selection, SessionUpdate};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use tools::NodeDrag;
pub use viewport::ViewportController;
