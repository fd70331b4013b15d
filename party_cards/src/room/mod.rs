//! Async hosting for a session.
//!
//! A [`RoomActor`] runs on its own tokio task with an mpsc inbox and owns a
//! [`Session`](crate::game::Session). Callers talk to it through a cloneable
//! [`RoomHandle`]; every request carries a oneshot sender for the answer.
//! The actor also runs the session's timers and ticks held players once a
//! second.
//!
//! ## Example
//!
//! ```no_run
//! use party_cards::{GameSettings, Session, room::RoomActor};
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = Session::new(&[], GameSettings::default());
//!     let (handle, task) = RoomActor::spawn(session);
//!     let _ = handle.join(Some("ann".to_string()), None).await;
//!     let _ = handle.close().await;
//!     let _ = task.await;
//! }
//! ```

pub mod actor;
pub mod messages;

pub use actor::{ROOM_INBOX_SIZE, RoomActor, RoomError, RoomHandle};
pub use messages::{RoomMessage, RoomResponse};
