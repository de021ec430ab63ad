//! Dashboard synchronization core.
//!
//! ## Overview
//!
//! Keeps a local model of projects, features and subtasks consistent with a
//! server that mutates them asynchronously. The server pushes notifications
//! over a single event stream while the user issues commands (start, stop,
//! reorder, retry) whose effects come back out of band.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   SSE    ┌──────────────────────────────────────────────────┐
//! │  Server  │ ───────> │  stream.rs  (EventStreamClient, SseDecoder)      │
//! │          │          │         │ StreamSignal over mpsc                  │
//! │          │          │         v                                        │
//! │          │          │  session.rs  (DashboardSession, single writer)   │
//! │          │          │         │                                        │
//! │          │          │         │ reconciler::reduce() → Vec<Effect>     │
//! │          │          │         v                                        │
//! │          │          │  cache.rs  (Store = EntityCache + control)       │
//! │          │  HTTP    │         │                                        │
//! │          │ <─────── │  api.rs  (DashboardApi trait, HttpApi)           │
//! └──────────┘          │         │ &Store after every mutation            │
//!                       │         v                                        │
//!                       │  render.rs  (RenderSink)                         │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module       | Responsibility                                          |
//! |--------------|---------------------------------------------------------|
//! | `models`     | `Project`, `Feature`, `Subtask`, status enums, wire types |
//! | `events`     | Closed `StreamEvent` tagged union and parsing           |
//! | `control`    | Execution control state machine (idle/running/stopping) |
//! | `reorder`    | Drag session, tier-aware reorder proposal, submission   |
//!
//! ## Event Flow
//!
//! 1. `EventStreamClient` decodes an SSE `data` payload and sends
//!    `StreamSignal::Message` to the session.
//! 2. `reconciler::reduce_raw()` parses it, drops it if malformed, scopes it
//!    to the active project or background bookkeeping, and mutates the store.
//! 3. The returned effects (re-fetches, notices) are executed by the session;
//!    a re-fetched list replaces the cached one outright.
//! 4. After a `Disconnected` → `Connected` pair everything in view is fetched
//!    again and execution control is re-derived from feature statuses.

pub mod api;
pub mod cache;
pub mod control;
pub mod events;
pub mod models;
pub mod reconciler;
pub mod render;
pub mod reorder;
pub mod session;
pub mod stream;

pub use cache::Store;
pub use session::DashboardSession;
