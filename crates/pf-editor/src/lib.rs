pub mod commands;
pub mod config;
pub mod debounce;
pub mod handles;
pub mod recompute;
pub mod resize;
pub mod session;

pub use commands::{Applied, Command, CommandStack};
pub use config::EditorConfig;
pub use debounce::{PatchOrigin, PatchQueue};
pub use handles::{Handle, HandleSet, Indicator, enabled_handles, handles_for};
pub use recompute::{LayoutListener, Subscription, resolve_working_size};
pub use resize::{GestureError, GestureSession, Point, ResizeController, ResizeStep};
pub use session::{EditorSession, TickReport};
