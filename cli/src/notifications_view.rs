use crate::tables::{Column, Table, Width};
use books_lib::activity::ActivityRecord;
use books_lib::notifications::Notification;
use console::Term;

pub fn notifications_view(
    notifications: &[Notification],
    table_settings: &crate::tables::Settings,
) -> String {
    let id_image = |n: &Notification, _: &()| n.id.0.to_string();
    let unread_image = |n: &Notification, _: &()| {
        if n.is_read { String::new() } else { "*".to_string() }
    };
    let date_image = |n: &Notification, _: &()| {
        n.created_at.format("%Y-%m-%d %H:%M").to_string()
    };
    let kind_image = |n: &Notification, _: &()| n.kind.to_string();
    let message_image = |n: &Notification, _: &()| n.message.clone();

    let columns = vec![
        Column::new((), &id_image).with_title("Id"),
        Column::new((), &unread_image).with_title("New"),
        Column::new((), &date_image).with_title("Date"),
        Column::new((), &kind_image).with_title("Kind"),
        Column::new((), &message_image)
            .with_title("Message")
            .with_width(Width::ExpandWithMin(10)),
    ];
    let mut table = Table::new(columns, table_settings).with_col_headers();
    table.add_rows(notifications, 0);
    table.to_string(Term::stdout().size().1 as usize)
}

pub fn activity_view(
    records: &[ActivityRecord],
    table_settings: &crate::tables::Settings,
) -> String {
    let date_image = |r: &ActivityRecord, _: &()| {
        r.created_at.format("%Y-%m-%d %H:%M:%S").to_string()
    };
    let action_image = |r: &ActivityRecord, _: &()| r.action.to_string();
    let details_image = |r: &ActivityRecord, _: &()| r.summary();

    let columns = vec![
        Column::new((), &date_image).with_title("Date"),
        Column::new((), &action_image).with_title("Action"),
        Column::new((), &details_image)
            .with_title("Details")
            .with_width(Width::ExpandWithMin(10)),
    ];
    let mut table = Table::new(columns, table_settings).with_col_headers();
    table.add_rows(records, 0);
    table.to_string(Term::stdout().size().1 as usize)
}

#[cfg(test)]
mod test {
    use crate::notifications_view::{activity_view, notifications_view};
    use books_lib::activity::{Action, ActivityRecord};
    use books_lib::notifications::{
        Notification, NotificationId, NotificationKind,
    };
    use books_lib::users::UserId;
    use chrono::Local;
    use serde_json::json;

    #[test]
    fn test_notifications_view() {
        let notif = |id, is_read, message: &str| Notification {
            id: NotificationId(id),
            user: UserId(1),
            kind: NotificationKind::EntryPosted,
            message: message.into(),
            is_read,
            created_at: Local::now(),
        };
        let out = notifications_view(
            &[notif(2, false, "Entry #1 posted"), notif(1, true, "Welcome")],
            &crate::tables::Settings::default(),
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.get(2).unwrap().starts_with("2 │*  │"));
        assert!(lines.get(2).unwrap().contains("entry_posted"));
        assert!(lines.get(3).unwrap().starts_with("1 │   │"));
    }

    #[test]
    fn test_activity_view() {
        let out = activity_view(
            &[ActivityRecord {
                id: 1,
                user: UserId(1),
                action: Action::AccountCreate,
                details: json!({"code": "1010"}),
                created_at: Local::now(),
            }],
            &crate::tables::Settings::default(),
        );
        assert!(out.contains("account.create"));
        assert!(out.contains("code=1010"));
    }
}
