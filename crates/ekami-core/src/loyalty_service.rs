//! Loyalty programme: tier derivation, progress, points earning and redemption.

use std::sync::Arc;

use uuid::Uuid;

use ekami_domain::{
    LoyaltyActivity, LoyaltyMember, LoyaltyTier, LoyaltyTransaction, LoyaltyTransactionKind,
    Timestamped, TierThresholds,
};

use crate::store::{collections, from_record, from_records, to_record, Query, RecordStore, SortOrder};
use crate::time::Clock;
use crate::CoreError;

const REVIEW_POINTS: u64 = 50;
const REFERRAL_POINTS: u64 = 200;

/// Where a member stands between the floor of their tier and the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierProgress {
    pub tier: LoyaltyTier,
    pub next_tier: Option<LoyaltyTier>,
    /// Whole percent in `0..=100`; platinum always reports 100.
    pub percent: u8,
    pub points_to_next: u64,
}

/// Pure loyalty arithmetic shared by the service and the shell.
pub struct LoyaltyCalculator;

impl LoyaltyCalculator {
    pub fn tier_for(lifetime_points: u64, thresholds: &TierThresholds) -> LoyaltyTier {
        LoyaltyTier::ALL
            .iter()
            .rev()
            .copied()
            .find(|tier| lifetime_points >= thresholds.floor(*tier))
            .unwrap_or(LoyaltyTier::Bronze)
    }

    /// Linear interpolation between the current tier floor and the next tier floor.
    pub fn tier_progress(member: &LoyaltyMember, thresholds: &TierThresholds) -> TierProgress {
        let lifetime = member.lifetime_points;
        let tier = Self::tier_for(lifetime, thresholds);
        let Some(next_tier) = tier.next() else {
            return TierProgress {
                tier,
                next_tier: None,
                percent: 100,
                points_to_next: 0,
            };
        };
        let floor = thresholds.floor(tier);
        let ceiling = thresholds.floor(next_tier);
        let span = ceiling.saturating_sub(floor).max(1);
        let earned = lifetime.saturating_sub(floor);
        let percent = (earned.saturating_mul(100) / span).min(100) as u8;
        TierProgress {
            tier,
            next_tier: Some(next_tier),
            percent,
            points_to_next: ceiling.saturating_sub(lifetime),
        }
    }

    pub fn discount_percent(tier: LoyaltyTier) -> u8 {
        match tier {
            LoyaltyTier::Bronze => 0,
            LoyaltyTier::Silver => 5,
            LoyaltyTier::Gold => 10,
            LoyaltyTier::Platinum => 15,
        }
    }

    /// Extra earning percentage granted on top of the base points.
    pub fn tier_bonus_percent(tier: LoyaltyTier) -> u64 {
        match tier {
            LoyaltyTier::Bronze => 0,
            LoyaltyTier::Silver => 10,
            LoyaltyTier::Gold => 25,
            LoyaltyTier::Platinum => 50,
        }
    }

    /// Points for one activity. `amount` is in whole currency units and is
    /// ignored for flat-rate activities. The result is floored.
    pub fn points_for(activity: LoyaltyActivity, amount: u64, tier: LoyaltyTier) -> u64 {
        // Base points scaled by 100 so purchase halves stay exact until the final floor.
        let base_centi: u128 = match activity {
            LoyaltyActivity::Repair | LoyaltyActivity::Rental => u128::from(amount) * 100,
            LoyaltyActivity::Purchase => u128::from(amount) * 50,
            LoyaltyActivity::Review => u128::from(REVIEW_POINTS) * 100,
            LoyaltyActivity::Referral => u128::from(REFERRAL_POINTS) * 100,
        };
        let bonus = u128::from(100 + Self::tier_bonus_percent(tier));
        let points = base_centi * bonus / 10_000;
        u64::try_from(points).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarnOutcome {
    pub member: LoyaltyMember,
    pub transaction: LoyaltyTransaction,
    /// Set when this earning moved the member into a new tier.
    pub promoted_from: Option<LoyaltyTier>,
}

/// Persists members and their points ledger.
pub struct LoyaltyService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    thresholds: TierThresholds,
}

impl LoyaltyService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, thresholds: TierThresholds) -> Self {
        Self {
            store,
            clock,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &TierThresholds {
        &self.thresholds
    }

    pub fn member(&self, user_id: &str) -> Result<Option<LoyaltyMember>, CoreError> {
        let query = Query::new().eq("user_id", user_id).limit(1);
        self.store
            .select(collections::LOYALTY_MEMBERS, &query)?
            .into_iter()
            .next()
            .map(from_record)
            .transpose()
    }

    /// Most recent entries first.
    pub fn history(&self, member_id: Uuid, limit: usize) -> Result<Vec<LoyaltyTransaction>, CoreError> {
        let query = Query::new()
            .eq("member_id", member_id.to_string())
            .order_by("created_at", SortOrder::Descending)
            .limit(limit);
        from_records(self.store.select(collections::LOYALTY_TRANSACTIONS, &query)?)
    }

    /// Credits points for an activity, enrolling the user on first earning.
    ///
    /// The stored tier is re-derived from lifetime points on every earning.
    pub fn earn(
        &self,
        user_id: &str,
        activity: LoyaltyActivity,
        amount: u64,
        reference_id: Option<String>,
    ) -> Result<EarnOutcome, CoreError> {
        let now = self.clock.now();
        let existing = self.member(user_id)?;
        let is_new = existing.is_none();
        let mut member = existing.unwrap_or_else(|| LoyaltyMember::new(user_id, now));

        let points = LoyaltyCalculator::points_for(activity, amount, member.tier);
        if points == 0 {
            return Err(CoreError::Validation(format!(
                "A {activity} of {amount} does not earn any points"
            )));
        }

        let ledger_points = ledger_amount(points)?;
        let (Some(available), Some(lifetime)) = (
            member.available_points.checked_add(points),
            member.lifetime_points.checked_add(points),
        ) else {
            return Err(CoreError::Validation(format!(
                "Crediting {points} points would overflow the balance"
            )));
        };

        let previous_tier = member.tier;
        member.available_points = available;
        member.lifetime_points = lifetime;
        member.activity.record(activity);
        member.tier = LoyaltyCalculator::tier_for(member.lifetime_points, &self.thresholds);
        member.touch(now);

        let record = to_record(&member)?;
        if is_new {
            self.store.insert(collections::LOYALTY_MEMBERS, record)?;
        } else {
            self.store
                .update(collections::LOYALTY_MEMBERS, &member.id.to_string(), record)?;
        }

        let transaction = LoyaltyTransaction {
            id: Uuid::new_v4(),
            member_id: member.id,
            points: ledger_points,
            kind: LoyaltyTransactionKind::Earned,
            description: format!("Earned {points} points for {activity}"),
            reference_id,
            created_at: now,
        };
        self.store
            .insert(collections::LOYALTY_TRANSACTIONS, to_record(&transaction)?)?;

        let promoted_from = (member.tier != previous_tier).then_some(previous_tier);
        tracing::info!(
            user_id,
            points,
            tier = %member.tier,
            promoted = promoted_from.is_some(),
            "loyalty points earned"
        );
        Ok(EarnOutcome {
            member,
            transaction,
            promoted_from,
        })
    }

    /// Spends points; never more than the available balance.
    pub fn redeem(
        &self,
        user_id: &str,
        points: u64,
        description: &str,
    ) -> Result<(LoyaltyMember, LoyaltyTransaction), CoreError> {
        if points == 0 {
            return Err(CoreError::Validation(
                "Redeem at least one point".into(),
            ));
        }
        let mut member = self
            .member(user_id)?
            .ok_or_else(|| CoreError::not_found(collections::LOYALTY_MEMBERS, user_id))?;
        if points > member.available_points {
            return Err(CoreError::Validation(format!(
                "Cannot redeem {points} points; only {} available",
                member.available_points
            )));
        }

        let ledger_points = ledger_amount(points)?;

        let now = self.clock.now();
        member.available_points -= points;
        member.touch(now);
        self.store.update(
            collections::LOYALTY_MEMBERS,
            &member.id.to_string(),
            to_record(&member)?,
        )?;

        let description = if description.trim().is_empty() {
            format!("Redeemed {points} points")
        } else {
            description.trim().to_string()
        };
        let transaction = LoyaltyTransaction {
            id: Uuid::new_v4(),
            member_id: member.id,
            points: -ledger_points,
            kind: LoyaltyTransactionKind::Redeemed,
            description,
            reference_id: None,
            created_at: now,
        };
        self.store
            .insert(collections::LOYALTY_TRANSACTIONS, to_record(&transaction)?)?;
        tracing::info!(user_id, points, remaining = member.available_points, "loyalty points redeemed");
        Ok((member, transaction))
    }
}

/// Signed ledger value for a point amount; rejects amounts the ledger cannot hold.
fn ledger_amount(points: u64) -> Result<i64, CoreError> {
    i64::try_from(points).map_err(|_| {
        CoreError::Validation(format!("{points} points exceeds what the ledger can record"))
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::store::MemoryStore;
    use crate::time::FixedClock;

    fn member_with(lifetime: u64) -> LoyaltyMember {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut member = LoyaltyMember::new("u-1", now);
        member.lifetime_points = lifetime;
        member.available_points = lifetime;
        member
    }

    fn service(store: Arc<MemoryStore>) -> LoyaltyService {
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap()));
        LoyaltyService::new(store, clock, TierThresholds::default())
    }

    #[test]
    fn tiers_follow_thresholds() {
        let thresholds = TierThresholds::default();
        assert_eq!(LoyaltyCalculator::tier_for(0, &thresholds), LoyaltyTier::Bronze);
        assert_eq!(LoyaltyCalculator::tier_for(999, &thresholds), LoyaltyTier::Bronze);
        assert_eq!(LoyaltyCalculator::tier_for(1_000, &thresholds), LoyaltyTier::Silver);
        assert_eq!(LoyaltyCalculator::tier_for(5_000, &thresholds), LoyaltyTier::Gold);
        assert_eq!(LoyaltyCalculator::tier_for(20_000, &thresholds), LoyaltyTier::Platinum);
    }

    #[test]
    fn progress_interpolates_between_floors() {
        let thresholds = TierThresholds::default();
        let progress = LoyaltyCalculator::tier_progress(&member_with(3_000), &thresholds);
        assert_eq!(progress.tier, LoyaltyTier::Silver);
        assert_eq!(progress.next_tier, Some(LoyaltyTier::Gold));
        assert_eq!(progress.percent, 50);
        assert_eq!(progress.points_to_next, 2_000);

        let top = LoyaltyCalculator::tier_progress(&member_with(40_000), &thresholds);
        assert_eq!(top.percent, 100);
        assert_eq!(top.next_tier, None);
    }

    #[test]
    fn points_apply_multipliers_and_tier_bonus() {
        use LoyaltyActivity::*;
        assert_eq!(LoyaltyCalculator::points_for(Repair, 250, LoyaltyTier::Bronze), 250);
        assert_eq!(LoyaltyCalculator::points_for(Purchase, 101, LoyaltyTier::Bronze), 50);
        assert_eq!(LoyaltyCalculator::points_for(Rental, 100, LoyaltyTier::Gold), 125);
        assert_eq!(LoyaltyCalculator::points_for(Review, 9_999, LoyaltyTier::Bronze), 50);
        assert_eq!(LoyaltyCalculator::points_for(Referral, 0, LoyaltyTier::Platinum), 300);
        assert_eq!(LoyaltyCalculator::points_for(Purchase, 3, LoyaltyTier::Silver), 1);
    }

    #[test]
    fn discounts_grow_with_tier() {
        let discounts: Vec<u8> = LoyaltyTier::ALL
            .iter()
            .map(|tier| LoyaltyCalculator::discount_percent(*tier))
            .collect();
        assert_eq!(discounts, vec![0, 5, 10, 15]);
    }

    #[test]
    fn earning_enrolls_and_rederives_tier() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone());

        let first = service
            .earn("u-1", LoyaltyActivity::Repair, 800, Some("rr-1".into()))
            .unwrap();
        assert_eq!(first.member.tier, LoyaltyTier::Bronze);
        assert!(first.promoted_from.is_none());

        let second = service
            .earn("u-1", LoyaltyActivity::Repair, 300, None)
            .unwrap();
        assert_eq!(second.member.lifetime_points, 1_100);
        assert_eq!(second.member.tier, LoyaltyTier::Silver);
        assert_eq!(second.promoted_from, Some(LoyaltyTier::Bronze));
        assert_eq!(second.member.activity.repairs, 2);

        assert_eq!(store.count(collections::LOYALTY_MEMBERS), 1);
        assert_eq!(store.count(collections::LOYALTY_TRANSACTIONS), 2);
    }

    #[test]
    fn redeem_never_exceeds_available_points() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone());
        service.earn("u-1", LoyaltyActivity::Rental, 500, None).unwrap();

        let err = service.redeem("u-1", 501, "").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let (member, transaction) = service.redeem("u-1", 200, "Oil change discount").unwrap();
        assert_eq!(member.available_points, 300);
        assert_eq!(member.lifetime_points, 500);
        assert!(member.available_points <= member.lifetime_points);
        assert_eq!(transaction.points, -200);
        assert_eq!(transaction.kind, LoyaltyTransactionKind::Redeemed);

        let history = service.history(member.id, 10).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn redeem_requires_membership() {
        let service = service(Arc::new(MemoryStore::new()));
        assert!(matches!(
            service.redeem("stranger", 10, ""),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn zero_point_earnings_are_rejected() {
        let service = service(Arc::new(MemoryStore::new()));
        assert!(service
            .earn("u-1", LoyaltyActivity::Purchase, 1, None)
            .is_err());
    }

    #[test]
    fn amounts_beyond_the_ledger_range_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone());

        let err = service
            .earn("u-1", LoyaltyActivity::Repair, u64::MAX, None)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(store.count(collections::LOYALTY_MEMBERS), 0);
        assert_eq!(store.count(collections::LOYALTY_TRANSACTIONS), 0);

        let rich = member_with(u64::MAX);
        store
            .insert(collections::LOYALTY_MEMBERS, to_record(&rich).unwrap())
            .unwrap();
        let too_many = i64::MAX as u64 + 1;
        let err = service.redeem("u-1", too_many, "").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(
            service.member("u-1").unwrap().unwrap().available_points,
            u64::MAX
        );
        assert_eq!(store.count(collections::LOYALTY_TRANSACTIONS), 0);

        let (member, txn) = service.redeem("u-1", 500, "").unwrap();
        assert_eq!(member.available_points, u64::MAX - 500);
        assert_eq!(txn.points, -500);
    }
}
