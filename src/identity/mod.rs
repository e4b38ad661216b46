//! Identity of the local author.

use parking_lot::RwLock;

use crate::model::User;

/// Supplies the signed-in user, if any.
pub trait IdentityProvider: Send + Sync + 'static {
    fn current_user(&self) -> Option<User>;
}

/// A fixed identity that can be swapped or cleared at runtime.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    user: RwLock<Option<User>>,
}

impl StaticIdentity {
    pub fn new(user: User) -> Self {
        Self { user: RwLock::new(Some(user)) }
    }

    /// No one signed in; submissions are dropped.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The stock demo account.
    pub fn demo() -> Self {
        Self::new(User::new("user_123", "Demo User"))
    }

    pub fn sign_in(&self, user: User) {
        *self.user.write() = Some(user);
    }

    pub fn sign_out(&self) {
        *self.user.write() = None;
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<User> {
        self.user.read().clone()
    }
}
