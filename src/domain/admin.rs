//! Administrator accounts allowed to register dispensers and read statistics.

/// A stored administrator.
///
/// `password_hash` is a bcrypt hash string; the plain password is never
/// kept.
#[derive(Clone, PartialEq, Eq)]
pub struct Admin {
    /// Store-assigned identifier, used as the token subject.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// bcrypt hash of the password.
    pub password_hash: String,
}

impl std::fmt::Debug for Admin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Admin")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
