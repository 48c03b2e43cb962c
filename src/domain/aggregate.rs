//! Per-category tallies of an order's lines, used only to shape metric emission.

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;

use super::catalog::category_label;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTally {
    /// Number of order lines in the category (not units).
    pub lines: i64,
    pub revenue: BigDecimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryAggregate {
    tallies: BTreeMap<String, CategoryTally>,
}

impl CategoryAggregate {
    /// Build from `(category, unit price, quantity)` triples.
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a BigDecimal, i32)>,
    {
        let mut aggregate = Self::default();
        for (category, price, quantity) in lines {
            aggregate.add(category, price, quantity);
        }
        aggregate
    }

    pub fn add(&mut self, category: &str, price: &BigDecimal, quantity: i32) {
        let tally = self
            .tallies
            .entry(category_label(category).to_string())
            .or_insert_with(|| CategoryTally {
                lines: 0,
                revenue: BigDecimal::from(0),
            });
        tally.lines += 1;
        tally.revenue += price * BigDecimal::from(quantity);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryTally)> {
        self.tallies.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, category: &str) -> Option<&CategoryTally> {
        self.tallies.get(category)
    }

    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    pub fn total_revenue(&self) -> BigDecimal {
        self.tallies
            .values()
            .fold(BigDecimal::from(0), |acc, t| acc + &t.revenue)
    }
}
