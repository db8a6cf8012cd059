use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;
use tally_core::{
    aggregate, daily_report, personal_report, roster_report, RepoError, SubmissionEvent,
    UserRecord,
};

fn submission(id: i64, sender_id: i64, label: &str, on_time: bool, valid: bool) -> SubmissionEvent {
    SubmissionEvent {
        id,
        sender_id,
        sender_name: format!("Student {sender_id}"),
        sender_email: format!("s{sender_id}@example.edu"),
        label: label.to_string(),
        content: format!("post {id}"),
        timestamp: Utc.with_ymd_and_hms(2023, 1, 10, 9, 0, 0).unwrap() + chrono::Duration::minutes(id),
        on_time,
        valid,
    }
}

fn member(user_id: i64, name: &str) -> UserRecord {
    UserRecord {
        user_id,
        role: 400,
        delivery_email: format!("{}@example.edu", name.to_lowercase()),
        full_name: name.to_string(),
    }
}

#[test]
fn any_qualifying_submission_earns_credit_in_every_order() {
    let flags = [(true, false), (true, true), (false, true)];
    let orders = [[0, 1, 2], [1, 0, 2], [2, 1, 0], [2, 0, 1]];

    for order in orders {
        let events: Vec<_> = order
            .iter()
            .enumerate()
            .map(|(id, &pick)| {
                let (on_time, valid) = flags[pick];
                submission(id as i64, 4, "w3fri", on_time, valid)
            })
            .collect();

        let result = aggregate(&events).unwrap();
        let tally = result.get(4).unwrap();
        assert_eq!(tally.credit, vec!["w3fri"], "order {order:?}");
        assert!(tally.no_credit.is_empty());
    }
}

#[test]
fn only_disqualified_submissions_land_in_no_credit() {
    let result = aggregate(&[
        submission(1, 4, "w3fri", false, true),
        submission(2, 4, "w3fri", true, false),
    ])
    .unwrap();

    let tally = result.get(4).unwrap();
    assert!(tally.credit.is_empty());
    assert_eq!(tally.no_credit, vec!["w3fri"]);
}

#[test]
fn resubmission_after_invalidation_earns_credit() {
    let result = aggregate(&[
        submission(10, 7, "w2wed", true, false),
        submission(11, 7, "w2wed", true, true),
    ])
    .unwrap();

    let report = personal_report(&result, 7);
    assert_eq!(report.credit_labels, vec!["w2wed"]);
    assert!(report.no_credit_labels.is_empty());
}

#[test]
fn personal_report_is_empty_for_unknown_sender() {
    let result = aggregate(&[submission(1, 4, "w1mon", true, true)]).unwrap();

    let report = personal_report(&result, 99);
    assert!(report.credit_labels.is_empty());
    assert!(report.no_credit_labels.is_empty());
    assert_eq!(result.credit_count(99), 0);
}

#[test]
fn roster_has_one_row_per_observed_sender() {
    let users: BTreeMap<i64, UserRecord> = [
        (1, member(1, "Ada")),
        (2, member(2, "Grace")),
        (3, member(3, "Never Posted")),
    ]
    .into_iter()
    .collect();
    let result = aggregate(&[
        submission(1, 1, "w1mon", true, true),
        submission(2, 2, "w1mon", false, true),
        submission(3, 1, "w1wed", true, true),
        submission(4, 1, "w1fri", true, true),
        submission(5, 1, "w1fri", false, false),
    ])
    .unwrap();

    let rows = roster_report(&result, &users).unwrap();
    let summary: Vec<(&str, &str, usize)> = rows
        .iter()
        .map(|row| (row.name.as_str(), row.email.as_str(), row.credit_count))
        .collect();
    assert_eq!(
        summary,
        vec![("Ada", "ada@example.edu", 3), ("Grace", "grace@example.edu", 0)]
    );
}

#[test]
fn roster_surfaces_missing_users() {
    let result = aggregate(&[submission(1, 5, "w1mon", true, true)]).unwrap();
    let users: BTreeMap<i64, UserRecord> = BTreeMap::new();

    assert!(matches!(
        roster_report(&result, &users),
        Err(RepoError::UserNotFound(5))
    ));
}

#[test]
fn daily_report_lists_every_submission_for_label_in_order() {
    let events = vec![
        submission(1, 1, "w2mon", true, true),
        submission(2, 2, "w2wed", true, true),
        submission(3, 2, "w2mon", false, false),
        submission(4, 1, "w2mon", true, true),
    ];

    let entries = daily_report(&events, "w2mon");
    let ids: Vec<i64> = entries.iter().map(|entry| entry.event_id).collect();
    assert_eq!(ids, vec![1, 3, 4]);
    assert_eq!(entries[1].sender_name, "Student 2");
    assert_eq!(entries[1].content, "post 3");
    assert!(daily_report(&events, "w9fri").is_empty());
}

#[test]
fn aggregation_is_recomputed_from_input_each_call() {
    let first = aggregate(&[submission(1, 1, "w1mon", false, true)]).unwrap();
    let second = aggregate(&[submission(2, 1, "w1mon", true, true)]).unwrap();

    assert_eq!(first.credit_count(1), 0);
    assert_eq!(second.credit_count(1), 1);
    assert!(aggregate(&[]).unwrap().is_empty());
}
