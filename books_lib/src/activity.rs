use crate::errors::{BooksError, Result};
use crate::users::UserId;
use chrono::{DateTime, Local};
use itertools::Itertools;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Every action that modifies the books, or opens a session, is recorded
/// in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    Register,
    Login,
    PasswordChange,
    AccountCreate,
    AccountUpdate,
    AccountClose,
    AccountReopen,
    AccountDelete,
    EntryPost,
    EntryEdit,
    EntryDelete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Register => "register",
            Action::Login => "login",
            Action::PasswordChange => "password.change",
            Action::AccountCreate => "account.create",
            Action::AccountUpdate => "account.update",
            Action::AccountClose => "account.close",
            Action::AccountReopen => "account.reopen",
            Action::AccountDelete => "account.delete",
            Action::EntryPost => "entry.post",
            Action::EntryEdit => "entry.edit",
            Action::EntryDelete => "entry.delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = BooksError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "register" => Action::Register,
            "login" => Action::Login,
            "password.change" => Action::PasswordChange,
            "account.create" => Action::AccountCreate,
            "account.update" => Action::AccountUpdate,
            "account.close" => Action::AccountClose,
            "account.reopen" => Action::AccountReopen,
            "account.delete" => Action::AccountDelete,
            "entry.post" => Action::EntryPost,
            "entry.edit" => Action::EntryEdit,
            "entry.delete" => Action::EntryDelete,
            other => Err(BooksError::not_found("action", other))?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub user: UserId,
    pub action: Action,

    // Free-form json object describing the target of the action
    pub details: serde_json::Value,

    pub created_at: DateTime<Local>,
}

impl ActivityRecord {
    /// A one-line summary of the details, e.g. "code=1010 name=Cash"
    pub fn summary(&self) -> String {
        use serde_json::Value;
        match &self.details {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => format!("{k}={s}"),
                    Value::Null
                    | Value::Bool(_)
                    | Value::Number(_)
                    | Value::Array(_)
                    | Value::Object(_) => format!("{k}={v}"),
                })
                .join(" "),
            Value::Null => String::new(),
            Value::Bool(_)
            | Value::Number(_)
            | Value::String(_)
            | Value::Array(_) => self.details.to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::activity::{Action, ActivityRecord};
    use crate::users::UserId;
    use chrono::Local;
    use serde_json::json;

    #[test]
    fn test_action_names() {
        assert_eq!("entry.post".parse::<Action>().unwrap(), Action::EntryPost);
        assert_eq!(Action::AccountClose.to_string(), "account.close");
        assert!("entry.undo".parse::<Action>().is_err());
    }

    #[test]
    fn test_summary() {
        let rec = ActivityRecord {
            id: 1,
            user: UserId(1),
            action: Action::EntryPost,
            details: json!({"entry": 12, "reference": "INV-1"}),
            created_at: Local::now(),
        };
        assert_eq!(rec.summary(), "entry=12 reference=INV-1");
    }
}
