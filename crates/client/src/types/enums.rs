//! Closed string enumerations used by explorer records.
//!
//! Unknown wire values never fail: they decode to the `Unknown` variant so
//! newer servers can add kinds without breaking older clients.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            $($variant,)+
            #[default]
            Unknown,
        }

        impl $name {
            /// Parse a wire value, falling back to `Unknown`.
            pub fn parse(s: &str) -> Self {
                match s {
                    $($text $(| $alias)* => $name::$variant,)+
                    _ => $name::Unknown,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                    $name::Unknown => "unknown",
                }
            }

            pub fn is_valid(&self) -> bool {
                !matches!(self, $name::Unknown)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Ok(Self::parse(&s))
            }
        }
    };
}

string_enum!(
    /// Operation kinds, including the explorer's synthetic implicit events.
    OpType {
        Activation => "activate_account",
        DoubleBaking => "double_baking_evidence",
        DoubleEndorsement => "double_endorsement_evidence",
        DoublePreendorsement => "double_preendorsement_evidence",
        Nonce => "seed_nonce_revelation",
        Transaction => "transaction",
        Origination => "origination",
        Delegation => "delegation",
        Reveal => "reveal",
        Endorsement => "endorsement",
        Preendorsement => "preendorsement",
        Proposal => "proposals" | "proposal",
        Ballot => "ballot",
        RegisterConstant => "register_constant",
        DepositsLimit => "set_deposits_limit",
        Bake => "bake",
        Unfreeze => "unfreeze",
        Invoice => "invoice",
        Airdrop => "airdrop",
        SeedSlash => "seed_slash",
        Migration => "migration",
        Subsidy => "subsidy",
        Deactivation => "deactivation",
        Deposit => "deposit",
        Reward => "reward",
        Bonus => "bonus",
        Batch => "batch",
    }
);

string_enum!(
    /// Operation result status.
    OpStatus {
        Applied => "applied",
        Failed => "failed",
        Backtracked => "backtracked",
        Skipped => "skipped",
    }
);

string_enum!(
    /// Governance voting period, accepting both current and legacy names.
    VotingPeriodKind {
        Proposal => "proposal",
        Exploration => "exploration" | "testing_vote",
        Cooldown => "cooldown" | "testing",
        Promotion => "promotion" | "promotion_vote",
        Adoption => "adoption",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_values() {
        assert_eq!(OpType::parse("transaction"), OpType::Transaction);
        assert_eq!(OpStatus::parse("backtracked"), OpStatus::Backtracked);
        assert_eq!(VotingPeriodKind::parse("adoption"), VotingPeriodKind::Adoption);
    }

    #[test]
    fn test_parse_legacy_aliases() {
        assert_eq!(VotingPeriodKind::parse("testing_vote"), VotingPeriodKind::Exploration);
        assert_eq!(VotingPeriodKind::parse("promotion_vote").as_str(), "promotion");
        assert_eq!(OpType::parse("proposal"), OpType::Proposal);
    }

    #[test]
    fn test_unknown_is_fail_soft() {
        let kind = OpType::parse("smart_rollup_execute");
        assert_eq!(kind, OpType::Unknown);
        assert!(!kind.is_valid());
        assert_eq!(kind.to_string(), "unknown");
        let status: OpStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, OpStatus::Unknown);
    }

    #[test]
    fn test_serde_uses_wire_names() {
        assert_eq!(serde_json::to_string(&OpType::Activation).unwrap(), "\"activate_account\"");
        let kind: OpType = serde_json::from_str("\"seed_nonce_revelation\"").unwrap();
        assert_eq!(kind, OpType::Nonce);
    }
}
