//! Integration tests driving the scheduler, dispatcher, presence registry
//! and mailbox together against the in-memory store.

mod dispatch_test;
mod helpers;
mod presence_test;
mod scheduler_test;
