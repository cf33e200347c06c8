//! Occurrence lifecycle and reputation adjustment.
//!
//! [`plan_transition`] is a pure function: given the current and requested
//! status and the reporter's reputation, it computes every side effect of the
//! status change without touching storage. The occurrence service applies the
//! resulting [`TransitionPlan`] inside a single database transaction.

use chrono::NaiveDate;
use thiserror::Error;

use super::{OccurrenceStatus, PointType};

/// Rejection streak at which an account is blocked.
pub const BLOCK_THRESHOLD: i32 = 3;

/// Point balance and block gate of a reporting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reputation {
    pub points: i32,
    pub rejection_streak: i32,
    pub blocked: bool,
}

/// How a nullable occurrence field changes as part of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange<T> {
    Keep,
    Set(T),
    Clear,
}

impl<T> FieldChange<T> {
    /// Resolves the change against the stored value.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Self::Keep => current,
            Self::Set(value) => Some(value),
            Self::Clear => None,
        }
    }
}

/// Rejection email that must be attempted once the transition is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionNotice {
    pub justification: String,
    pub account_blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: OccurrenceStatus,
    pub to: OccurrenceStatus,
    pub reputation: Reputation,
    pub finalized_on: FieldChange<NaiveDate>,
    pub rejection_justification: FieldChange<String>,
    pub point_type: FieldChange<PointType>,
    pub notice: Option<RejectionNotice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A justification is required to reject an occurrence")]
    MissingJustification,
}

/// Points taken back when an occurrence leaves `status`.
///
/// The rejection penalty is never reversed here; only the solved path
/// touches the rejection streak.
const fn reversal(status: OccurrenceStatus) -> i32 {
    match status {
        OccurrenceStatus::InProgress => 25,
        OccurrenceStatus::ClosedSolved => 50,
        OccurrenceStatus::Rejected
        | OccurrenceStatus::Registered
        | OccurrenceStatus::ClosedUnsolved => 0,
    }
}

/// Points granted (or taken, when negative) when an occurrence enters `status`.
const fn award(status: OccurrenceStatus) -> i32 {
    match status {
        OccurrenceStatus::InProgress => 25,
        OccurrenceStatus::ClosedSolved => 50,
        OccurrenceStatus::Rejected => -10,
        OccurrenceStatus::Registered | OccurrenceStatus::ClosedUnsolved => 0,
    }
}

/// Computes the side effects of moving an occurrence from `from` to `to`.
///
/// Returns `Ok(None)` when the status does not change: no point, counter or
/// notification side effect applies in that case.
///
/// # Errors
///
/// Returns [`TransitionError::MissingJustification`] when rejecting without a
/// non-blank justification. Nothing has been computed or mutated at that
/// point.
pub fn plan_transition(
    from: OccurrenceStatus,
    to: OccurrenceStatus,
    justification: Option<&str>,
    reputation: Reputation,
    today: NaiveDate,
) -> Result<Option<TransitionPlan>, TransitionError> {
    if from == to {
        return Ok(None);
    }

    let justification = justification.map(str::trim).filter(|j| !j.is_empty());
    if to == OccurrenceStatus::Rejected && justification.is_none() {
        return Err(TransitionError::MissingJustification);
    }

    let mut next = reputation;
    next.points = (reputation.points - reversal(from) + award(to)).max(0);

    let plan = match to {
        OccurrenceStatus::ClosedSolved => {
            if from == OccurrenceStatus::Rejected {
                next.rejection_streak = (next.rejection_streak - 1).max(0);
                if next.blocked && next.rejection_streak < BLOCK_THRESHOLD {
                    next.blocked = false;
                }
            }
            TransitionPlan {
                from,
                to,
                reputation: next,
                finalized_on: FieldChange::Set(today),
                rejection_justification: FieldChange::Clear,
                point_type: FieldChange::Set(PointType::Solved),
                notice: None,
            }
        }
        OccurrenceStatus::Rejected => {
            let justification = justification
                .ok_or(TransitionError::MissingJustification)?
                .to_string();
            next.rejection_streak += 1;
            if next.rejection_streak >= BLOCK_THRESHOLD {
                next.blocked = true;
            }
            TransitionPlan {
                from,
                to,
                reputation: next,
                finalized_on: FieldChange::Set(today),
                rejection_justification: FieldChange::Set(justification.clone()),
                point_type: FieldChange::Keep,
                notice: Some(RejectionNotice {
                    justification,
                    account_blocked: next.blocked,
                }),
            }
        }
        OccurrenceStatus::InProgress => TransitionPlan {
            from,
            to,
            reputation: next,
            finalized_on: FieldChange::Clear,
            rejection_justification: FieldChange::Clear,
            point_type: FieldChange::Keep,
            notice: None,
        },
        OccurrenceStatus::ClosedUnsolved | OccurrenceStatus::Registered => TransitionPlan {
            from,
            to,
            reputation: next,
            finalized_on: FieldChange::Clear,
            rejection_justification: FieldChange::Clear,
            point_type: FieldChange::Clear,
            notice: None,
        },
    };

    Ok(Some(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use OccurrenceStatus::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn rep(points: i32, streak: i32, blocked: bool) -> Reputation {
        Reputation {
            points,
            rejection_streak: streak,
            blocked,
        }
    }

    fn plan(from: OccurrenceStatus, to: OccurrenceStatus, r: Reputation) -> TransitionPlan {
        plan_transition(from, to, Some("motivo"), r, today())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn same_status_is_a_noop() {
        for status in OccurrenceStatus::ALL {
            let result = plan_transition(status, status, None, rep(40, 2, false), today());
            assert_eq!(result, Ok(None));
        }
    }

    #[test]
    fn in_progress_to_solved_reverses_then_awards() {
        let p = plan(InProgress, ClosedSolved, rep(25, 0, false));
        assert_eq!(p.reputation.points, 50);
        assert_eq!(p.finalized_on, FieldChange::Set(today()));
        assert_eq!(p.point_type, FieldChange::Set(PointType::Solved));
        assert_eq!(p.rejection_justification, FieldChange::Clear);
        assert!(p.notice.is_none());
    }

    #[test]
    fn solved_to_in_progress_reverses_solved_award() {
        let p = plan(ClosedSolved, InProgress, rep(60, 0, false));
        assert_eq!(p.reputation.points, 35);
        assert_eq!(p.finalized_on, FieldChange::Clear);
        assert_eq!(p.rejection_justification, FieldChange::Clear);
    }

    #[test]
    fn balance_is_clamped_at_zero() {
        let p = plan(ClosedSolved, ClosedUnsolved, rep(20, 0, false));
        assert_eq!(p.reputation.points, 0);

        let p = plan(Registered, Rejected, rep(4, 0, false));
        assert_eq!(p.reputation.points, 0);
    }

    #[test]
    fn rejection_requires_justification() {
        for justification in [None, Some(""), Some("   ")] {
            let result =
                plan_transition(InProgress, Rejected, justification, rep(30, 0, false), today());
            assert_eq!(result, Err(TransitionError::MissingJustification));
        }
    }

    #[test]
    fn third_rejection_blocks_account() {
        let p = plan_transition(
            InProgress,
            Rejected,
            Some("duplicate report"),
            rep(25, 2, false),
            today(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(p.reputation.rejection_streak, 3);
        assert!(p.reputation.blocked);
        assert_eq!(p.reputation.points, 0);
        assert_eq!(p.finalized_on, FieldChange::Set(today()));
        assert_eq!(
            p.rejection_justification,
            FieldChange::Set("duplicate report".to_string())
        );
        assert_eq!(
            p.notice,
            Some(RejectionNotice {
                justification: "duplicate report".to_string(),
                account_blocked: true,
            })
        );
    }

    #[test]
    fn consecutive_rejections_accumulate() {
        let mut r = rep(100, 0, false);
        let mut status = Registered;
        for _ in 0..3 {
            let p = plan(status, Rejected, r);
            r = p.reputation;
            status = Registered;
        }
        assert_eq!(r.rejection_streak, 3);
        assert!(r.blocked);
        assert_eq!(r.points, 70);
    }

    #[test]
    fn solving_a_rejected_occurrence_decrements_streak_and_unblocks() {
        let p = plan(Rejected, ClosedSolved, rep(0, 3, true));
        assert_eq!(p.reputation.rejection_streak, 2);
        assert!(!p.reputation.blocked);
        assert_eq!(p.reputation.points, 50);
    }

    #[test]
    fn solving_keeps_block_while_streak_stays_high() {
        let p = plan(Rejected, ClosedSolved, rep(0, 4, true));
        assert_eq!(p.reputation.rejection_streak, 3);
        assert!(p.reputation.blocked);
    }

    #[test]
    fn streak_never_goes_negative() {
        let p = plan(Rejected, ClosedSolved, rep(0, 0, false));
        assert_eq!(p.reputation.rejection_streak, 0);
    }

    #[test]
    fn leaving_rejected_for_other_status_keeps_penalty_and_streak() {
        let p = plan(Rejected, InProgress, rep(0, 2, false));
        assert_eq!(p.reputation.points, 25);
        assert_eq!(p.reputation.rejection_streak, 2);

        let p = plan(Rejected, ClosedUnsolved, rep(15, 3, true));
        assert_eq!(p.reputation.points, 15);
        assert!(p.reputation.blocked);
    }

    #[test]
    fn other_statuses_clear_point_type() {
        for to in [ClosedUnsolved, Registered] {
            let p = plan(ClosedSolved, to, rep(50, 0, false));
            assert_eq!(p.point_type, FieldChange::Clear);
            assert_eq!(p.finalized_on, FieldChange::Clear);
        }
    }

    #[test]
    fn finalization_matches_status_for_every_transition() {
        for from in OccurrenceStatus::ALL {
            for to in OccurrenceStatus::ALL {
                let Some(p) =
                    plan_transition(from, to, Some("x"), rep(10, 1, false), today()).unwrap()
                else {
                    continue;
                };
                let stored = if from.is_finalized() { Some(today()) } else { None };
                let finalized = p.finalized_on.apply(stored);
                assert_eq!(finalized.is_some(), to.is_finalized(), "{from} -> {to}");
                assert!(p.reputation.points >= 0);
            }
        }
    }

    #[test]
    fn field_change_apply() {
        assert_eq!(FieldChange::Keep.apply(Some(1)), Some(1));
        assert_eq!(FieldChange::Set(2).apply(Some(1)), Some(2));
        assert_eq!(FieldChange::<i32>::Clear.apply(Some(1)), None);
    }
}
