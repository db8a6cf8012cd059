use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;
use tally_core::{
    aggregate, merge_events, DropReason, DueDay, IngestError, IngestService, Materialized,
    RawEvent, Reaction, RepoError, ScheduleError, TermConfig, UserRecord, WeeklyGridResolver,
};

const INVALID: &str = "x";

fn resolver() -> WeeklyGridResolver {
    WeeklyGridResolver::new(TermConfig::new(
        NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
        23,
        10,
        [DueDay::Mon, DueDay::Wed, DueDay::Fri],
    ))
    .unwrap()
}

fn directory() -> BTreeMap<i64, UserRecord> {
    [
        (1, "Ada", 400),
        (2, "Grace", 400),
        (50, "Prof Turing", 200),
        (60, "Moderator", 300),
    ]
    .into_iter()
    .map(|(user_id, name, role)| {
        (
            user_id,
            UserRecord {
                user_id,
                role,
                delivery_email: format!("{}@example.edu", user_id),
                full_name: name.to_string(),
            },
        )
    })
    .collect()
}

fn raw(id: i64, sender_id: i64, subject: &str, sent: (u32, u32)) -> RawEvent {
    let (day, hour) = sent;
    RawEvent {
        id,
        sender_id,
        sender_full_name: format!("sender {sender_id}"),
        subject: subject.to_string(),
        content: format!("answer {id}"),
        timestamp: Utc
            .with_ymd_and_hms(2023, 1, day, hour, 0, 0)
            .unwrap()
            .timestamp(),
        reactions: Vec::new(),
    }
}

fn flagged(mut event: RawEvent, emoji: &str, by: i64) -> RawEvent {
    event.reactions.push(Reaction {
        emoji_name: emoji.to_string(),
        user_id: by,
    });
    event
}

#[test]
fn member_submission_is_resolved_with_flags() {
    let resolver = resolver();
    let users = directory();
    let service = IngestService::new(&resolver, &users, INVALID);

    let Materialized::Kept(event) = service
        .materialize(&raw(100, 1, "Questions [w1wed]", (4, 22)))
        .unwrap()
    else {
        panic!("expected a kept submission");
    };
    assert_eq!(event.label, "w1wed");
    assert_eq!(event.sender_name, "Ada");
    assert_eq!(event.sender_email, "1@example.edu");
    assert!(event.on_time);
    assert!(event.valid);

    let Materialized::Kept(late) = service
        .materialize(&raw(101, 1, "Questions [w1wed]", (5, 0)))
        .unwrap()
    else {
        panic!("expected a kept submission");
    };
    assert!(!late.on_time);
}

#[test]
fn non_submissions_are_dropped_with_reason() {
    let resolver = resolver();
    let users = directory();
    let service = IngestService::new(&resolver, &users, INVALID);

    let mut bot = raw(1, 999, "[w1mon]", (2, 9));
    bot.sender_full_name = "Notification Bot".to_string();
    assert_eq!(
        service.materialize(&bot).unwrap(),
        Materialized::Dropped(DropReason::NotificationBot)
    );
    assert_eq!(
        service.materialize(&raw(2, 50, "[w1mon]", (2, 9))).unwrap(),
        Materialized::Dropped(DropReason::StaffSender)
    );
    assert_eq!(
        service.materialize(&raw(3, 60, "[w1mon]", (2, 9))).unwrap(),
        Materialized::Dropped(DropReason::StaffSender)
    );
    assert_eq!(
        service
            .materialize(&raw(4, 1, "general chatter", (2, 9)))
            .unwrap(),
        Materialized::Dropped(DropReason::UnlabeledTopic)
    );
    assert_eq!(
        service.materialize(&raw(5, 1, "[w1tue]", (2, 9))).unwrap(),
        Materialized::Dropped(DropReason::UnlabeledTopic)
    );
}

#[test]
fn only_privileged_markers_invalidate() {
    let resolver = resolver();
    let users = directory();
    let service = IngestService::new(&resolver, &users, INVALID);

    let by_member = flagged(raw(1, 1, "[w1mon]", (2, 9)), INVALID, 2);
    assert!(service.is_valid(&by_member).unwrap());

    let other_emoji = flagged(raw(2, 1, "[w1mon]", (2, 9)), "thumbs_up", 50);
    assert!(service.is_valid(&other_emoji).unwrap());

    let by_staff = flagged(raw(3, 1, "[w1mon]", (2, 9)), INVALID, 50);
    assert!(!service.is_valid(&by_staff).unwrap());

    // Unknown users reacting with other emoji are never looked up.
    let unknown = flagged(raw(4, 1, "[w1mon]", (2, 9)), "wave", 12345);
    assert!(service.is_valid(&unknown).unwrap());
}

#[test]
fn unknown_sender_is_an_error() {
    let resolver = resolver();
    let users = directory();
    let service = IngestService::new(&resolver, &users, INVALID);

    let err = service
        .materialize(&raw(1, 777, "[w1mon]", (2, 9)))
        .unwrap_err();
    assert!(matches!(err, IngestError::Repo(RepoError::UserNotFound(777))));
}

#[test]
fn batch_keeps_last_copy_of_repeated_ids() {
    let resolver = resolver();
    let users = directory();
    let service = IngestService::new(&resolver, &users, INVALID);

    let batch = vec![
        raw(10, 1, "[w2wed]", (11, 9)),
        raw(11, 50, "[w2wed]", (11, 9)),
        raw(12, 2, "[w2wed]", (12, 9)),
        flagged(raw(10, 1, "[w2wed]", (11, 9)), INVALID, 50),
    ];

    let outcome = service.ingest_batch(&batch).unwrap();
    assert_eq!(outcome.dropped, 1);
    let ids: Vec<i64> = outcome.events.iter().map(|event| event.id).collect();
    assert_eq!(ids, vec![10, 12]);
    assert!(!outcome.events[0].valid);
    assert!(!outcome.events[1].on_time);
}

#[test]
fn merge_overwrites_known_ids_in_place() {
    let resolver = resolver();
    let users = directory();
    let service = IngestService::new(&resolver, &users, INVALID);

    let existing = service
        .ingest_batch(&[
            flagged(raw(1, 1, "[w2wed]", (10, 9)), INVALID, 50),
            raw(2, 2, "[w2wed]", (10, 9)),
        ])
        .unwrap()
        .events;
    let incoming = service
        .ingest_batch(&[raw(3, 1, "[w2wed]", (11, 9)), raw(1, 1, "[w2wed]", (10, 9))])
        .unwrap()
        .events;

    let merged = merge_events(existing, incoming);
    let ids: Vec<i64> = merged.iter().map(|event| event.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(merged[0].valid);

    let tally = aggregate(&merged).unwrap();
    assert_eq!(tally.credit_count(1), 1);
    assert_eq!(tally.credit_count(2), 1);
}

#[test]
fn end_to_end_resubmission_earns_credit() {
    let resolver = resolver();
    let users = directory();
    let service = IngestService::new(&resolver, &users, INVALID);

    let outcome = service
        .ingest_batch(&[
            flagged(raw(1, 1, "[w2wed]", (10, 9)), INVALID, 60),
            raw(2, 1, "Redo [w2wed]", (11, 20)),
            raw(3, 2, "[w2fri]", (14, 9)),
        ])
        .unwrap();

    let tally = aggregate(&outcome.events).unwrap();
    assert_eq!(tally.get(1).unwrap().credit, vec!["w2wed"]);
    assert!(tally.get(2).unwrap().credit.is_empty());
    assert_eq!(tally.get(2).unwrap().no_credit, vec!["w2fri"]);
}

#[test]
fn out_of_range_deadline_is_reported_as_schedule_error() {
    let resolver = WeeklyGridResolver::new(TermConfig::new(
        NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
        23,
        200_000_000,
        [DueDay::Mon],
    ))
    .unwrap();
    let users = directory();
    let service = IngestService::new(&resolver, &users, INVALID);

    let err = service
        .ingest_batch(&[raw(1, 1, "[w150000000mon]", (2, 9))])
        .unwrap_err();
    assert!(matches!(
        err,
        IngestError::Schedule(ScheduleError::DeadlineOutOfRange(_))
    ));
}
