//! Domain subsystems. Each one owns its clap surface, its state transitions
//! over the shared [`Document`](crate::core::schemas::Document), and its
//! output rendering.

pub mod note;
pub mod timer;
pub mod todo;
