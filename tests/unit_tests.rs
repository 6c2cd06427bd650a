// Unit tests for Lume Match

use chrono::Utc;
use lume_match::core::states::{plan_matched, plan_pending};
use lume_match::core::{exclusion_set, is_available, CandidateSelector};
use lume_match::models::{Direction, PoolEntry, Relation};
use lume_match::{AgeRange, DeclineRecord, MatchError, MatchState, MatchStatus, UserSummary};
use uuid::Uuid;

fn create_entry(name: &str, age: Option<u8>, status: Option<MatchStatus>) -> PoolEntry {
    PoolEntry {
        user: UserSummary {
            id: Uuid::new_v4(),
            username: name.to_string(),
            age,
        },
        status,
    }
}

fn unmatched(id: Uuid) -> MatchState {
    MatchState::unmatched(id, Utc::now())
}

#[test]
fn test_age_range_bounds() {
    assert!(AgeRange::new(18, 100).is_ok());
    assert!(AgeRange::new(30, 30).is_ok());
    assert!(matches!(AgeRange::new(17, 30), Err(MatchError::Validation(_))));
    assert!(matches!(AgeRange::new(18, 101), Err(MatchError::Validation(_))));
    assert!(matches!(AgeRange::new(40, 30), Err(MatchError::Validation(_))));
}

#[test]
fn test_age_range_inclusive() {
    let range = AgeRange::new(21, 35).unwrap();
    assert!(range.contains(21));
    assert!(range.contains(35));
    assert!(!range.contains(20));
    assert!(!range.contains(36));
}

#[test]
fn test_availability() {
    assert!(is_available(Some(MatchStatus::Unmatched)));
    assert!(!is_available(Some(MatchStatus::Pending)));
    assert!(!is_available(Some(MatchStatus::Matched)));
    assert!(!is_available(None));
}

#[test]
fn test_exclusion_ignores_unrelated_declines() {
    let me = Uuid::new_v4();
    let declines = vec![DeclineRecord {
        sender: Uuid::new_v4(),
        receiver: Uuid::new_v4(),
        declined_at: Utc::now(),
    }];

    let excluded = exclusion_set(me, &declines);
    assert_eq!(excluded.len(), 1);
    assert!(excluded.contains(&me));
}

#[test]
fn test_selector_combined_filters() {
    let selector = CandidateSelector::new();
    let requester = Uuid::new_v4();
    let free = Some(MatchStatus::Unmatched);

    let keep = create_entry("keep", Some(25), free);
    let declined_by_me = create_entry("declined", Some(25), free);
    let too_old = create_entry("old", Some(45), free);
    let ageless = create_entry("ageless", None, free);
    let engaged = create_entry("engaged", Some(25), Some(MatchStatus::Pending));
    let declines = vec![DeclineRecord {
        sender: declined_by_me.user.id,
        receiver: requester,
        declined_at: Utc::now(),
    }];

    let pool = vec![
        keep.clone(),
        declined_by_me,
        too_old,
        ageless,
        engaged,
    ];
    let result = selector.select(requester, AgeRange::new(18, 30).unwrap(), pool, &declines);

    assert_eq!(result.total_pool, 5);
    assert_eq!(result.candidates.len(), 1);
    assert!(result.candidates.contains(&keep.user));
}

#[test]
fn test_selector_empty_pool() {
    let result = CandidateSelector::new().select(
        Uuid::new_v4(),
        AgeRange::new(18, 30).unwrap(),
        Vec::new(),
        &[],
    );
    assert!(result.candidates.is_empty());
    assert_eq!(result.total_pool, 0);
}

#[test]
fn test_plan_pending_sets_directions() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let (sender, receiver) = plan_pending(&unmatched(a), &unmatched(b), Utc::now()).unwrap();

    assert_eq!(
        sender.relation,
        Relation::Pending { counterpart: b, direction: Direction::Outgoing }
    );
    assert_eq!(
        receiver.relation,
        Relation::Pending { counterpart: a, direction: Direction::Incoming }
    );
    assert!(receiver.is_incoming_from(a));
    assert!(sender.is_outgoing_to(b));
}

#[test]
fn test_plan_pending_rejects_engaged_parties() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let now = Utc::now();
    let (_, b_pending) = plan_pending(&unmatched(a), &unmatched(b), now).unwrap();

    let err = plan_pending(&unmatched(c), &b_pending, now).unwrap_err();
    assert!(matches!(err, MatchError::Conflict(_)));

    let matched = MatchState {
        subject: b,
        relation: Relation::Matched { counterpart: a },
        updated_at: now,
    };
    let err = plan_pending(&unmatched(c), &matched, now).unwrap_err();
    assert!(matches!(err, MatchError::Conflict(_)));
}

#[test]
fn test_plan_matched_requires_mutual_pending() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let now = Utc::now();
    let (a_out, b_in) = plan_pending(&unmatched(a), &unmatched(b), now).unwrap();

    let (a_matched, b_matched) = plan_matched(&a_out, &b_in, now).unwrap();
    assert_eq!(a_matched.relation, Relation::Matched { counterpart: b });
    assert_eq!(b_matched.relation, Relation::Matched { counterpart: a });

    let err = plan_matched(&a_out, &unmatched(c), now).unwrap_err();
    assert!(matches!(err, MatchError::Conflict(_)));
}
