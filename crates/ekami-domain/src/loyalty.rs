//! Loyalty programme members, tiers and points ledger entries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{Identifiable, Timestamped};

/// Ordered membership level; later variants grant larger discounts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LoyaltyTier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl LoyaltyTier {
    pub const ALL: [LoyaltyTier; 4] = [
        LoyaltyTier::Bronze,
        LoyaltyTier::Silver,
        LoyaltyTier::Gold,
        LoyaltyTier::Platinum,
    ];

    pub fn next(self) -> Option<Self> {
        match self {
            LoyaltyTier::Bronze => Some(LoyaltyTier::Silver),
            LoyaltyTier::Silver => Some(LoyaltyTier::Gold),
            LoyaltyTier::Gold => Some(LoyaltyTier::Platinum),
            LoyaltyTier::Platinum => None,
        }
    }
}

impl fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoyaltyTier::Bronze => "Bronze",
            LoyaltyTier::Silver => "Silver",
            LoyaltyTier::Gold => "Gold",
            LoyaltyTier::Platinum => "Platinum",
        };
        f.write_str(label)
    }
}

/// Lifetime-point floors at which each tier starts. Bronze always starts at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub silver: u64,
    pub gold: u64,
    pub platinum: u64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            silver: 1_000,
            gold: 5_000,
            platinum: 15_000,
        }
    }
}

impl TierThresholds {
    pub fn floor(&self, tier: LoyaltyTier) -> u64 {
        match tier {
            LoyaltyTier::Bronze => 0,
            LoyaltyTier::Silver => self.silver,
            LoyaltyTier::Gold => self.gold,
            LoyaltyTier::Platinum => self.platinum,
        }
    }

    /// Thresholds must climb strictly from silver to platinum.
    pub fn is_ordered(&self) -> bool {
        0 < self.silver && self.silver < self.gold && self.gold < self.platinum
    }
}

/// What a member did to earn points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoyaltyActivity {
    Repair,
    Rental,
    Purchase,
    Review,
    Referral,
}

impl LoyaltyActivity {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "repair" => Some(LoyaltyActivity::Repair),
            "rental" | "booking" => Some(LoyaltyActivity::Rental),
            "purchase" | "sale" => Some(LoyaltyActivity::Purchase),
            "review" => Some(LoyaltyActivity::Review),
            "referral" => Some(LoyaltyActivity::Referral),
            _ => None,
        }
    }
}

impl fmt::Display for LoyaltyActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoyaltyActivity::Repair => "repair",
            LoyaltyActivity::Rental => "rental",
            LoyaltyActivity::Purchase => "purchase",
            LoyaltyActivity::Review => "review",
            LoyaltyActivity::Referral => "referral",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCounters {
    pub bookings: u32,
    pub repairs: u32,
    pub reviews: u32,
    pub referrals: u32,
}

impl ActivityCounters {
    pub fn record(&mut self, activity: LoyaltyActivity) {
        match activity {
            LoyaltyActivity::Repair => self.repairs += 1,
            LoyaltyActivity::Rental | LoyaltyActivity::Purchase => self.bookings += 1,
            LoyaltyActivity::Review => self.reviews += 1,
            LoyaltyActivity::Referral => self.referrals += 1,
        }
    }
}

/// Row stored in the `loyalty_members` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyMember {
    pub id: Uuid,
    pub user_id: String,
    /// Spendable balance; never exceeds `lifetime_points`.
    pub available_points: u64,
    pub lifetime_points: u64,
    #[serde(default)]
    pub tier: LoyaltyTier,
    #[serde(default)]
    pub activity: ActivityCounters,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoyaltyMember {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            available_points: 0,
            lifetime_points: 0,
            tier: LoyaltyTier::Bronze,
            activity: ActivityCounters::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Identifiable for LoyaltyMember {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Timestamped for LoyaltyMember {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoyaltyTransactionKind {
    Earned,
    Redeemed,
    Bonus,
}

/// Row stored in the `loyalty_transactions` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyTransaction {
    pub id: Uuid,
    pub member_id: Uuid,
    /// Positive when earned, negative when redeemed.
    pub points: i64,
    pub kind: LoyaltyTransactionKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered() {
        assert!(LoyaltyTier::Bronze < LoyaltyTier::Silver);
        assert!(LoyaltyTier::Gold < LoyaltyTier::Platinum);
        assert_eq!(LoyaltyTier::Platinum.next(), None);
    }

    #[test]
    fn default_thresholds_climb() {
        let thresholds = TierThresholds::default();
        assert!(thresholds.is_ordered());
        assert_eq!(thresholds.floor(LoyaltyTier::Bronze), 0);
    }

    #[test]
    fn counters_track_activity_kinds() {
        let mut counters = ActivityCounters::default();
        counters.record(LoyaltyActivity::Repair);
        counters.record(LoyaltyActivity::Rental);
        counters.record(LoyaltyActivity::Purchase);
        assert_eq!(counters.repairs, 1);
        assert_eq!(counters.bookings, 2);
    }
}
