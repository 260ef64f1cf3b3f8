//! Apiary Actor Runtime Core
//!
//! Address resolution, exclusive ordered mailbox delivery, and the spawn
//! path for a single node of the actor runtime.
//!
//! # Architecture
//!
//! ```text
//! sender ──► ProcessRegistry ──► Process {Local, Remote, DeadLetter}
//!                                    │ (Local)
//!                                    ▼
//!                        Mailbox ── queues: system │ user
//!                                    │ CAS Idle→Busy
//!                                    ▼
//!                        Dispatcher (worker pool) ──► turn
//!                                    │
//!                                    ▼
//!                        MessageInvoker ──► actor state
//!                                    │ on failure
//!                                    ▼
//!                        escalation channel
//! ```
//!
//! A mailbox is a cooperative scheduling unit: conceptually
//! single-threaded, layered over a genuinely multi-threaded worker pool.
//! The atomic Idle/Busy status is the only shared mutable state requiring
//! compare-and-swap; the queues are multi-producer/single-consumer by
//! construction of the protocol.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod factory;
pub mod invoker;
pub mod mailbox;
pub mod message;
pub mod pid;
pub mod process;
pub mod queue;
pub mod registry;
pub mod spawn;

pub use config::RuntimeConfig;
pub use dispatch::{DeferredDispatcher, Dispatcher, TokioDispatcher, DEFAULT_THROUGHPUT};
pub use error::{Result, RuntimeError};
pub use factory::{ActorFactory, PropsRegistry};
pub use invoker::MessageInvoker;
pub use mailbox::{DefaultMailbox, Mailbox};
pub use message::{AnyMessage, EscalatedMessage, SystemMessage};
pub use pid::{Pid, NO_HOST};
pub use process::{DeadLetterProcess, LocalProcess, Process};
pub use queue::UnboundedMailboxQueue;
pub use registry::ProcessRegistry;
pub use spawn::{spawn, spawn_named, Props};
