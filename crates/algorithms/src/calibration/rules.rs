//! Attraction rule derivation

use std::fmt::Write as _;

use ndarray::{Array2, Array3};

use super::config::{ClassRoles, RulePolicy};

/// Binary attraction rules, one row per active destination class and one
/// column per neighbour class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttractionRules {
    /// First active class, the class of row 0
    first_active: usize,
    matrix: Array2<u8>,
}

impl AttractionRules {
    /// The 0/1 matrix indexed (active row, neighbour class)
    pub fn matrix(&self) -> &Array2<u8> {
        &self.matrix
    }

    /// Number of active destination rows
    pub fn rows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Whether `neighbour` attracts transitions to `destination`.
    /// `false` for destinations that are not active.
    pub fn get(&self, destination: usize, neighbour: usize) -> bool {
        destination
            .checked_sub(self.first_active)
            .and_then(|row| self.matrix.get((row, neighbour)))
            .is_some_and(|&v| v == 1)
    }

    /// Whitespace-separated text of the transposed matrix: one line per
    /// neighbour class, one column per active destination
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for row in self.matrix.t().rows() {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            let _ = writeln!(out, "{}", line.join(" "));
        }
        out
    }
}

/// Derive the rule matrix from the significance and enrichment tables.
///
/// Neighbour `q` attracts destination `p` when `p == q`, or when at least
/// `policy.min_significant` of the policy rings have both
/// `|z| > policy.z_limit` and a positive log enrichment. Ring indices past
/// the end of the tables are ignored.
pub fn derive_rules(
    z_scores: &Array3<Option<f64>>,
    log_enrichment: &Array3<Option<f64>>,
    roles: &ClassRoles,
    policy: &RulePolicy,
) -> AttractionRules {
    let (rings, _, classes) = z_scores.dim();
    let mut matrix = Array2::zeros((roles.active, classes));

    for (row, p) in roles.active_classes().enumerate() {
        for q in 0..classes {
            if p == q {
                matrix[(row, q)] = 1;
                continue;
            }
            let significant = policy
                .rings
                .iter()
                .filter(|&&d| d < rings)
                .filter(|&&d| {
                    let strong = z_scores[(d, p, q)].is_some_and(|z| z.abs() > policy.z_limit);
                    let enriched = log_enrichment[(d, p, q)].is_some_and(|l| l > 0.0);
                    strong && enriched
                })
                .count();
            if significant >= policy.min_significant {
                matrix[(row, q)] = 1;
            }
        }
    }

    AttractionRules {
        first_active: roles.passive,
        matrix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> ClassRoles {
        ClassRoles::from_counts(3, 1, 0).unwrap()
    }

    fn tables() -> (Array3<Option<f64>>, Array3<Option<f64>>) {
        let z = Array3::from_elem((3, 3, 3), None);
        let l = Array3::from_elem((3, 3, 3), None);
        (z, l)
    }

    #[test]
    fn test_reflexive_rules() {
        let (z, l) = tables();
        let rules = derive_rules(&z, &l, &roles(), &RulePolicy::default());
        assert_eq!(rules.matrix().dim(), (2, 3));
        assert!(rules.get(1, 1));
        assert!(rules.get(2, 2));
        assert!(!rules.get(1, 2));
        // passive destinations have no row
        assert!(!rules.get(0, 0));
    }

    #[test]
    fn test_both_rings_must_agree() {
        let (mut z, mut l) = tables();
        for d in 1..3 {
            z[(d, 2, 0)] = Some(3.0);
            l[(d, 2, 0)] = Some(0.4);
        }
        // strong but depleted on one ring
        z[(1, 1, 0)] = Some(-4.0);
        l[(1, 1, 0)] = Some(0.2);
        z[(2, 1, 0)] = Some(4.0);
        l[(2, 1, 0)] = Some(-0.2);

        let rules = derive_rules(&z, &l, &roles(), &RulePolicy::default());
        assert!(rules.get(2, 0));
        assert!(!rules.get(1, 0));
        assert_eq!(rules.to_text(), "0 1\n1 0\n0 1\n");
    }

    #[test]
    fn test_text_has_one_line_per_neighbour() {
        let (z, l) = tables();
        let roles = ClassRoles::from_counts(3, 2, 0).unwrap();
        let rules = derive_rules(&z, &l, &roles, &RulePolicy::default());
        assert_eq!(rules.matrix().dim(), (1, 3));

        let text = rules.to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["0", "0", "1"]);
    }

    #[test]
    fn test_rings_beyond_catalog_are_skipped() {
        let (mut z, mut l) = tables();
        z[(2, 1, 0)] = Some(5.0);
        l[(2, 1, 0)] = Some(1.0);
        let policy = RulePolicy {
            rings: vec![2, 7],
            min_significant: 1,
            ..Default::default()
        };
        let rules = derive_rules(&z, &l, &roles(), &policy);
        assert!(rules.get(1, 0));
    }

    #[test]
    fn test_limit_is_strict() {
        let (mut z, mut l) = tables();
        for d in 1..3 {
            z[(d, 1, 2)] = Some(1.96);
            l[(d, 1, 2)] = Some(0.5);
        }
        let rules = derive_rules(&z, &l, &roles(), &RulePolicy::default());
        assert!(!rules.get(1, 2));
    }
}
