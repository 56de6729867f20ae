//! Menu catalog cache
//!
//! Holds the last-fetched dish/category lists. The ticket manager reads it
//! to resolve names and prices for derived totals; it is never mutated by
//! ticket operations.

use std::collections::HashMap;

use shared::{Category, Dish, Ticket};

/// Last-fetched menu snapshot.
#[derive(Debug, Default)]
pub struct CatalogCache {
    dishes: HashMap<i64, Dish>,
    categories: Vec<Category>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached snapshot with a freshly fetched one.
    pub fn replace(&mut self, dishes: Vec<Dish>, categories: Vec<Category>) {
        self.dishes = dishes.into_iter().map(|d| (d.id, d)).collect();
        self.categories = categories;
    }

    pub fn is_empty(&self) -> bool {
        self.dishes.is_empty()
    }

    pub fn dish(&self, id: i64) -> Option<&Dish> {
        self.dishes.get(&id)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Ticket total against cached prices. Lines whose dish is no longer
    /// in the catalog contribute nothing rather than failing the whole
    /// computation.
    pub fn ticket_total(&self, ticket: &Ticket) -> f64 {
        ticket
            .items
            .iter()
            .filter_map(|line| {
                self.dish(line.dish_id)
                    .map(|d| d.price * f64::from(line.quantity))
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dish(id: i64, price: f64) -> Dish {
        Dish {
            id,
            name: format!("dish-{}", id),
            price,
            category_id: 1,
            available: true,
        }
    }

    #[test]
    fn test_ticket_total() {
        let mut catalog = CatalogCache::new();
        catalog.replace(vec![dish(1, 10.0), dish(2, 4.5)], vec![]);

        let mut ticket = Ticket::draft(3, "Ana");
        ticket.merge_item(1, 2, "");
        ticket.merge_item(2, 1, "");
        assert_eq!(catalog.ticket_total(&ticket), 24.5);
    }

    #[test]
    fn test_unknown_dish_is_skipped() {
        let mut catalog = CatalogCache::new();
        catalog.replace(vec![dish(1, 10.0)], vec![]);

        let mut ticket = Ticket::draft(3, "Ana");
        ticket.merge_item(1, 1, "");
        ticket.merge_item(99, 3, "");
        assert_eq!(catalog.ticket_total(&ticket), 10.0);
    }
}
