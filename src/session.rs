// session.rs

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use uuid::Uuid;

/// Identity of whoever is driving a view or a request.
///
/// Created at sign-in (or as anonymous), handed to every component at
/// construction and invalidated at sign-out. Clones share the same
/// lifecycle, so invalidating one invalidates every component holding it.
#[derive(Debug, Clone)]
pub struct Session {
    user_id: Option<Uuid>,
    active: Arc<AtomicBool>,
}

impl Session {
    pub fn signed_in(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The authenticated user, or `None` when anonymous or signed out
    pub fn user_id(&self) -> Option<Uuid> {
        if self.active.load(Ordering::Acquire) {
            self.user_id
        } else {
            None
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id().is_some()
    }

    /// Sign-out
    pub fn invalidate(&self) {
        self.active.store(false, Ordering::Release);
    }
}
