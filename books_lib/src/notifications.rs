use crate::errors::{BooksError, Result};
use crate::users::UserId;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, Default, Serialize)]
pub struct NotificationId(pub i64);

/// What triggered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    Welcome,
    EntryPosted,
    EntryEdited,
    EntryDeleted,
    AccountClosed,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Welcome => "welcome",
            NotificationKind::EntryPosted => "entry_posted",
            NotificationKind::EntryEdited => "entry_edited",
            NotificationKind::EntryDeleted => "entry_deleted",
            NotificationKind::AccountClosed => "account_closed",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = BooksError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "welcome" => Ok(NotificationKind::Welcome),
            "entry_posted" => Ok(NotificationKind::EntryPosted),
            "entry_edited" => Ok(NotificationKind::EntryEdited),
            "entry_deleted" => Ok(NotificationKind::EntryDeleted),
            "account_closed" => Ok(NotificationKind::AccountClosed),
            other => Err(BooksError::not_found("notification kind", other)),
        }
    }
}

/// A message shown to the user the next time they look at their
/// notifications.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user: UserId,
    pub kind: NotificationKind,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Local>,
}

#[cfg(test)]
mod test {
    use crate::notifications::NotificationKind;

    #[test]
    fn test_kind_names() {
        for k in [
            NotificationKind::Welcome,
            NotificationKind::EntryPosted,
            NotificationKind::EntryEdited,
            NotificationKind::EntryDeleted,
            NotificationKind::AccountClosed,
        ] {
            assert_eq!(k.as_str().parse::<NotificationKind>().unwrap(), k);
        }
        assert!("unknown".parse::<NotificationKind>().is_err());
    }
}
