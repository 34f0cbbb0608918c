//! Closed taxonomy of relation families used in event vectors.
//!
//! The classifier is a deterministic rule set over the lowercased verb
//! string. The family order is part of the vector layout contract: the
//! one-hot block is compared by index across builds, so [`RelationFamily::ALL`]
//! must never be reordered.

use std::fmt;

/// Number of relation families; the width of the one-hot block.
pub const FAMILY_COUNT: usize = 9;

/// Fixed taxonomy mapping verbs to coarse relation semantics.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum RelationFamily {
    /// Statements, disclosures, and press announcements.
    Announce,
    /// Acquisitions, mergers, and purchases.
    Acquire,
    /// Partnerships, alliances, and collaborations.
    PartnerWith,
    /// Competitive positioning between actors.
    Compete,
    /// Supply and delivery relationships.
    Supply,
    /// Funding rounds and investment stakes.
    InvestIn,
    /// Product and service launches.
    Launch,
    /// Regulatory actions, lawsuits, and probes.
    Regulate,
    /// Anything the rules do not recognise.
    Other,
}

/// Substring rules evaluated in declaration order; first match wins.
const SUBSTRING_RULES: &[(&str, RelationFamily)] = &[
    ("announc", RelationFamily::Announce),
    ("unveil", RelationFamily::Announce),
    ("disclos", RelationFamily::Announce),
    ("acquir", RelationFamily::Acquire),
    ("purchas", RelationFamily::Acquire),
    ("merge", RelationFamily::Acquire),
    ("takeover", RelationFamily::Acquire),
    ("partner", RelationFamily::PartnerWith),
    ("collaborat", RelationFamily::PartnerWith),
    ("allianc", RelationFamily::PartnerWith),
    ("compet", RelationFamily::Compete),
    ("rival", RelationFamily::Compete),
    ("challeng", RelationFamily::Compete),
    ("suppl", RelationFamily::Supply),
    ("deliver", RelationFamily::Supply),
    ("provid", RelationFamily::Supply),
    ("invest", RelationFamily::InvestIn),
    ("fund", RelationFamily::InvestIn),
    ("financ", RelationFamily::InvestIn),
    ("launch", RelationFamily::Launch),
    ("releas", RelationFamily::Launch),
    ("introduc", RelationFamily::Launch),
    ("debut", RelationFamily::Launch),
    ("regulat", RelationFamily::Regulate),
    ("investigat", RelationFamily::Regulate),
    ("sanction", RelationFamily::Regulate),
];

/// Exact-match rules for verbs too short to be safe substrings.
const EXACT_RULES: &[(&str, RelationFamily)] = &[
    ("says", RelationFamily::Announce),
    ("said", RelationFamily::Announce),
    ("buys", RelationFamily::Acquire),
    ("bought", RelationFamily::Acquire),
    ("backs", RelationFamily::InvestIn),
    ("backed", RelationFamily::InvestIn),
    ("ships", RelationFamily::Supply),
    ("sues", RelationFamily::Regulate),
    ("sued", RelationFamily::Regulate),
    ("bans", RelationFamily::Regulate),
    ("banned", RelationFamily::Regulate),
    ("fines", RelationFamily::Regulate),
    ("fined", RelationFamily::Regulate),
];

impl RelationFamily {
    /// Every family in the fixed vector-layout order.
    pub const ALL: [Self; FAMILY_COUNT] = [
        Self::Announce,
        Self::Acquire,
        Self::PartnerWith,
        Self::Compete,
        Self::Supply,
        Self::InvestIn,
        Self::Launch,
        Self::Regulate,
        Self::Other,
    ];

    /// Returns the position of this family in the one-hot block.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the stable lowercase name of this family.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Announce => "announce",
            Self::Acquire => "acquire",
            Self::PartnerWith => "partner_with",
            Self::Compete => "compete",
            Self::Supply => "supply",
            Self::InvestIn => "invest_in",
            Self::Launch => "launch",
            Self::Regulate => "regulate",
            Self::Other => "other",
        }
    }

    /// Maps a verb to its family, falling back to [`Self::Other`].
    ///
    /// Matching is case-insensitive; exact rules run before substring rules.
    ///
    /// # Examples
    /// ```
    /// use kiji_core::RelationFamily;
    ///
    /// assert_eq!(RelationFamily::classify("Acquired"), RelationFamily::Acquire);
    /// assert_eq!(RelationFamily::classify("pondered"), RelationFamily::Other);
    /// ```
    #[must_use]
    pub fn classify(verb: &str) -> Self {
        let verb = verb.trim().to_lowercase();
        for &(pattern, family) in EXACT_RULES {
            if verb == pattern {
                return family;
            }
        }
        for &(pattern, family) in SUBSTRING_RULES {
            if verb.contains(pattern) {
                return family;
            }
        }
        Self::Other
    }

    /// Returns a one-hot indicator with a single `1.0` at [`Self::index`].
    #[must_use]
    pub fn one_hot(self) -> [f32; FAMILY_COUNT] {
        let mut block = [0.0; FAMILY_COUNT];
        block[self.index()] = 1.0;
        block
    }
}

impl fmt::Display for RelationFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[test]
    fn layout_order_is_fixed() {
        let indexes: Vec<usize> = RelationFamily::ALL.iter().map(|f| f.index()).collect();
        assert_eq!(indexes, (0..FAMILY_COUNT).collect::<Vec<_>>());
        assert_eq!(RelationFamily::Other.index(), FAMILY_COUNT - 1);
    }

    #[rstest]
    #[case("announces", RelationFamily::Announce)]
    #[case("ACQUIRED", RelationFamily::Acquire)]
    #[case("partners with", RelationFamily::PartnerWith)]
    #[case("competes against", RelationFamily::Compete)]
    #[case("supplies", RelationFamily::Supply)]
    #[case("invested in", RelationFamily::InvestIn)]
    #[case("launches", RelationFamily::Launch)]
    #[case("regulates", RelationFamily::Regulate)]
    #[case("sued", RelationFamily::Regulate)]
    #[case("backs", RelationFamily::InvestIn)]
    #[case("hums", RelationFamily::Other)]
    fn classify_maps_known_verbs(#[case] verb: &str, #[case] expected: RelationFamily) {
        assert_eq!(RelationFamily::classify(verb), expected);
    }

    #[test]
    fn one_hot_has_single_unit_entry() {
        for family in RelationFamily::ALL {
            let block = family.one_hot();
            let ones = block.iter().filter(|&&v| v == 1.0).count();
            let zeros = block.iter().filter(|&&v| v == 0.0).count();
            assert_eq!(ones, 1);
            assert_eq!(zeros, FAMILY_COUNT - 1);
            assert_eq!(block[family.index()], 1.0);
        }
    }
}
