//! Category hierarchy lookups.

use crate::catalog::Category;
use std::collections::{HashMap, HashSet};

pub struct CategoryTree<'a> {
    by_id: HashMap<&'a str, &'a Category>,
}

impl<'a> CategoryTree<'a> {
    pub fn new(categories: &'a [Category]) -> Self {
        Self {
            by_id: categories.iter().map(|c| (c.id.as_str(), c)).collect(),
        }
    }

    pub fn get(&self, category_id: &str) -> Option<&'a Category> {
        self.by_id.get(category_id).copied()
    }

    pub fn excluded_by_default(&self, category_id: &str) -> bool {
        self.get(category_id).is_some_and(|c| c.excluded_by_default)
    }

    /// Parent chain, nearest first, not including `category_id` itself.
    /// Stops at the first repeated id so a malformed cycle cannot loop.
    pub fn ancestors(&self, category_id: &str) -> Vec<&'a Category> {
        let mut out = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(category_id);

        let mut current = self.get(category_id).and_then(|c| c.parent_id.as_deref());
        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                log::warn!("calc: category cycle detected at {parent_id}");
                break;
            }
            match self.get(parent_id) {
                Some(parent) => {
                    out.push(parent);
                    current = parent.parent_id.as_deref();
                }
                None => break,
            }
        }
        out
    }

    /// Ids a rule may be attached to for this category, nearest first.
    /// Categories excluded by default only match rules naming them directly.
    pub fn rule_lookup_chain<'b>(&self, category_id: &'b str) -> Vec<&'b str>
    where
        'a: 'b,
    {
        let mut chain = vec![category_id];
        if !self.excluded_by_default(category_id) {
            chain.extend(self.ancestors(category_id).into_iter().map(|c| c.id.as_str()));
        }
        chain
    }

    /// Slugs of the category and its ancestors, nearest first. Used to find
    /// the travel preference that governs a category.
    pub fn slug_chain(&self, category_id: &str) -> Vec<&'a str> {
        let mut chain = Vec::new();
        if let Some(c) = self.get(category_id) {
            chain.push(c.slug.as_str());
        }
        chain.extend(self.ancestors(category_id).into_iter().map(|c| c.slug.as_str()));
        chain
    }
}
