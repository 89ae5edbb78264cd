//! Cache key generators for consistent key naming.
//!
//! Keys are `"<namespace>:<id>"` or `"<namespace>:<field>:<value>"`;
//! invalidation patterns append `*` to the namespace and id.

use std::fmt::Display;

/// Key of the cached user listing.
pub const USER_FIND_ALL: &str = "user:find-all";

/// Entity namespaces with their own read-through and invalidation helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    User,
    Course,
    Assignment,
    File,
}

impl Namespace {
    /// Key prefix of the namespace.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Course => "course",
            Self::Assignment => "assignment",
            Self::File => "file",
        }
    }

    /// `"<ns>:<id>"`
    #[must_use]
    pub fn key(self, id: impl Display) -> String {
        format!("{}:{}", self.prefix(), id)
    }

    /// `"<ns>:<id>*"`, matching the entity key and every key derived from it.
    #[must_use]
    pub fn pattern(self, id: impl Display) -> String {
        format!("{}:{}*", self.prefix(), id)
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Generate a cache key for a user by ID.
#[must_use]
pub fn user_by_id(id: impl Display) -> String {
    format!("user:id:{}", id)
}

/// Generate a cache key for a user by email.
#[must_use]
pub fn user_by_email(email: &str) -> String {
    format!("user:email:{}", email)
}

#[must_use]
pub fn user(id: impl Display) -> String {
    Namespace::User.key(id)
}

#[must_use]
pub fn course(id: impl Display) -> String {
    Namespace::Course.key(id)
}

#[must_use]
pub fn assignment(id: impl Display) -> String {
    Namespace::Assignment.key(id)
}

#[must_use]
pub fn file(id: impl Display) -> String {
    Namespace::File.key(id)
}

#[must_use]
pub fn user_pattern(id: impl Display) -> String {
    Namespace::User.pattern(id)
}

#[must_use]
pub fn course_pattern(id: impl Display) -> String {
    Namespace::Course.pattern(id)
}

#[must_use]
pub fn assignment_pattern(id: impl Display) -> String {
    Namespace::Assignment.pattern(id)
}

#[must_use]
pub fn file_pattern(id: impl Display) -> String {
    Namespace::File.pattern(id)
}

/// Keys a write to a user must delete: the id lookup, the email lookup
/// and the listing.
#[must_use]
pub fn user_write_set(id: impl Display, email: &str) -> [String; 3] {
    [user_by_id(id), user_by_email(email), USER_FIND_ALL.to_string()]
}
