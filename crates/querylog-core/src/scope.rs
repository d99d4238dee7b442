//! Task-local binding of a [`UnitOfWork`] to an async request.
//!
//! The data-access layer calls [`report`] from anywhere inside the future passed
//! to [`run`]; the event reaches that request's batch and no other.
//!
//! The binding belongs to the task polling that future. Work moved onto another
//! task with `tokio::spawn` or `spawn_blocking` does not see it: [`report`]
//! returns `false` there and the query is not recorded. Run such queries inside
//! the request future, or report them to the [`UnitOfWork`] directly.

use crate::context::Identity;
use crate::event::QueryExecuted;
use crate::unit_of_work::{QueryListener, UnitOfWork};
use std::cell::RefCell;
use std::future::Future;

tokio::task_local! {
    static CURRENT: RefCell<UnitOfWork>;
}

/// Drive `fut` with `uow` as the current unit of work and hand it back afterwards.
///
/// Only `fut` itself runs in the scope; tasks it spawns do not.
pub async fn run<F>(uow: UnitOfWork, fut: F) -> (F::Output, Option<UnitOfWork>)
where
    F: Future,
{
    let mut scoped = Box::pin(CURRENT.scope(RefCell::new(uow), fut));
    let output = scoped.as_mut().await;
    let uow = scoped.as_mut().take_value().map(RefCell::into_inner);
    (output, uow)
}

/// Feed `event` to the current unit of work.
///
/// Returns `false` outside of [`run`] (including tasks spawned from inside it)
/// or when the query was filtered out.
pub fn report(event: &QueryExecuted) -> bool {
    CURRENT
        .try_with(|uow| uow.borrow_mut().on_query(event))
        .unwrap_or(false)
}

/// Attach `identity` to the current unit of work, for auth code that runs
/// inside the request. Returns `false` outside of [`run`].
pub fn identify(identity: Identity) -> bool {
    CURRENT
        .try_with(|uow| uow.borrow_mut().identify(identity))
        .is_ok()
}

/// Whether the calling task is inside [`run`].
pub fn is_active() -> bool {
    CURRENT.try_with(|_| ()).is_ok()
}
