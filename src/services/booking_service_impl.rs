use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::info;

use crate::db::{CreateOutcome, NewOrderLine, Store};
use crate::domain::{parse_size_list, rental_charge, rental_days};
use crate::entities::items;
use crate::services::booking_service::{
    BookingError, BookingService, OrderDraft, PlacedOrder, Quote, QuoteLine,
};

/// SeaORM-backed implementation of the booking engine.
pub struct SeaOrmBookingService {
    store: Store,
}

impl SeaOrmBookingService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Loads every item referenced by the draft, keyed by id. Missing
    /// items surface as `ItemNotFound` for the first offender in draft
    /// order.
    async fn load_items(&self, draft: &OrderDraft) -> Result<HashMap<i32, items::Model>, BookingError> {
        let ids: Vec<i32> = draft.lines.iter().map(|l| l.item_id).collect();
        let found = self.store.get_items_by_ids(&ids).await?;
        let by_id: HashMap<i32, items::Model> = found.into_iter().map(|i| (i.id, i)).collect();

        for line in &draft.lines {
            if !by_id.contains_key(&line.item_id) {
                return Err(BookingError::ItemNotFound {
                    item_id: line.item_id,
                });
            }
        }
        Ok(by_id)
    }

    fn check_sizes(
        draft: &OrderDraft,
        items_by_id: &HashMap<i32, items::Model>,
    ) -> Result<(), BookingError> {
        for line in &draft.lines {
            let item = &items_by_id[&line.item_id];
            let offered = parse_size_list(&item.sizes).map_err(|e| {
                BookingError::Internal(format!("Corrupt size list on item {}: {e}", item.id))
            })?;
            if !offered.contains(&line.size) {
                return Err(BookingError::InvalidSize {
                    item_id: line.item_id,
                    size: line.size.to_string(),
                });
            }
        }
        Ok(())
    }

    fn price(
        draft: &OrderDraft,
        items_by_id: &HashMap<i32, items::Model>,
    ) -> Result<Quote, BookingError> {
        let days = rental_days(draft.start_date, draft.end_date);

        let mut total = Decimal::ZERO;
        let mut deposit_total = Decimal::ZERO;
        let mut lines = Vec::with_capacity(draft.lines.len());

        for line in &draft.lines {
            let item = &items_by_id[&line.item_id];
            let line_total = rental_charge(item.daily_rate, line.quantity, days);
            total += line_total;
            deposit_total += item.security_deposit * Decimal::from(line.quantity);
            lines.push(QuoteLine {
                item_id: item.id,
                name: item.name.clone(),
                size: line.size,
                quantity: line.quantity,
                daily_rate: item.daily_rate,
                line_total,
            });
        }

        Ok(Quote {
            rental_days: days,
            total,
            deposit_total,
            lines,
        })
    }
}

#[async_trait::async_trait]
impl BookingService for SeaOrmBookingService {
    async fn validate_and_quote(&self, draft: &OrderDraft) -> Result<Quote, BookingError> {
        if draft.lines.is_empty() {
            return Err(BookingError::EmptyOrder);
        }
        for line in &draft.lines {
            if line.quantity <= 0 {
                return Err(BookingError::InvalidQuantity {
                    item_id: line.item_id,
                });
            }
        }

        let items_by_id = self.load_items(draft).await?;
        Self::check_sizes(draft, &items_by_id)?;

        if draft.end_date < draft.start_date {
            return Err(BookingError::InvalidDateRange);
        }

        for line in &draft.lines {
            if self
                .store
                .booking_conflict_exists(line.item_id, draft.start_date, draft.end_date)
                .await?
            {
                return Err(BookingError::ItemUnavailable {
                    item_id: line.item_id,
                });
            }
        }

        Self::price(draft, &items_by_id)
    }

    async fn create_order(
        &self,
        user_id: i32,
        draft: &OrderDraft,
    ) -> Result<PlacedOrder, BookingError> {
        let quote = self.validate_and_quote(draft).await?;

        let lines: Vec<NewOrderLine> = draft
            .lines
            .iter()
            .map(|l| NewOrderLine {
                item_id: l.item_id,
                size: l.size.to_string(),
                quantity: l.quantity,
            })
            .collect();

        // The overlap check reruns inside a serializable transaction, so a
        // draft that passed the quote above can still lose the race here.
        let outcome = self
            .store
            .create_order_with_lines(user_id, draft.start_date, draft.end_date, quote.total, &lines)
            .await?;

        match outcome {
            CreateOutcome::Created { order, lines } => {
                info!(
                    "Order {} placed for user {} ({} lines, total {})",
                    order.id,
                    user_id,
                    lines.len(),
                    quote.total
                );
                Ok(PlacedOrder {
                    order,
                    lines,
                    quote,
                })
            }
            CreateOutcome::Conflict { item_id } => Err(BookingError::ItemUnavailable { item_id }),
        }
    }

    async fn recompute_total(&self, order_id: i32) -> Result<Decimal, BookingError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(BookingError::OrderNotFound)?;
        let lines = self.store.order_lines(order_id).await?;

        let ids: Vec<i32> = lines.iter().map(|l| l.item_id).collect();
        let items_by_id: HashMap<i32, items::Model> = self
            .store
            .get_items_by_ids(&ids)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        let days = rental_days(order.start_date, order.end_date);
        let mut total = Decimal::ZERO;
        for line in &lines {
            let item = items_by_id
                .get(&line.item_id)
                .ok_or(BookingError::ItemNotFound {
                    item_id: line.item_id,
                })?;
            total += rental_charge(item.daily_rate, line.quantity, days);
        }

        self.store.update_order_total(order_id, total).await?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SizeCode;
    use crate::entities::users::AuthProvider;
    use crate::services::booking_service::DraftLine;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    async fn test_store() -> Store {
        Store::new("sqlite::memory:").await.unwrap()
    }

    async fn seed_item(store: &Store, daily_rate: Decimal, deposit: Decimal) -> i32 {
        let cat = store
            .create_category("Lehengas", "lehengas", None, None)
            .await
            .unwrap();
        let item = store
            .create_item(crate::db::ItemInput {
                category_id: cat.id,
                name: "Embroidered Lehenga".to_string(),
                description: None,
                sizes: r#"["S","M","L"]"#.to_string(),
                daily_rate,
                security_deposit: deposit,
                available: true,
            })
            .await
            .unwrap();
        item.id
    }

    async fn seed_user(store: &Store) -> i32 {
        let (user, _) = store
            .get_or_create_user("renter@example.com", AuthProvider::Otp)
            .await
            .unwrap();
        user.id
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn draft(item_id: i32, start: &str, end: &str, quantity: i32) -> OrderDraft {
        OrderDraft {
            start_date: date(start),
            end_date: date(end),
            lines: vec![DraftLine {
                item_id,
                size: SizeCode::M,
                quantity,
            }],
        }
    }

    #[tokio::test]
    async fn quote_multiplies_rate_quantity_and_inclusive_days() {
        let store = test_store().await;
        let item_id = seed_item(&store, dec!(100.00), dec!(500.00)).await;
        let svc = SeaOrmBookingService::new(store);

        // Three inclusive days at 100/day for two garments.
        let quote = svc
            .validate_and_quote(&draft(item_id, "2026-01-01", "2026-01-03", 2))
            .await
            .unwrap();

        assert_eq!(quote.rental_days, 3);
        assert_eq!(quote.total, dec!(600.00));
        assert_eq!(quote.deposit_total, dec!(1000.00));
        assert_eq!(quote.lines.len(), 1);
        assert_eq!(quote.lines[0].line_total, dec!(600.00));
    }

    #[tokio::test]
    async fn same_day_booking_charges_one_day() {
        let store = test_store().await;
        let item_id = seed_item(&store, dec!(250.00), dec!(0.00)).await;
        let svc = SeaOrmBookingService::new(store);

        let quote = svc
            .validate_and_quote(&draft(item_id, "2026-03-15", "2026-03-15", 1))
            .await
            .unwrap();

        assert_eq!(quote.rental_days, 1);
        assert_eq!(quote.total, dec!(250.00));
    }

    #[tokio::test]
    async fn rejects_size_not_offered() {
        let store = test_store().await;
        let item_id = seed_item(&store, dec!(100.00), dec!(0.00)).await;
        let svc = SeaOrmBookingService::new(store);

        let mut d = draft(item_id, "2026-01-01", "2026-01-03", 1);
        d.lines[0].size = SizeCode::Xxxl;

        let err = svc.validate_and_quote(&d).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidSize { .. }));
    }

    #[tokio::test]
    async fn rejects_inverted_date_range() {
        let store = test_store().await;
        let item_id = seed_item(&store, dec!(100.00), dec!(0.00)).await;
        let svc = SeaOrmBookingService::new(store);

        let err = svc
            .validate_and_quote(&draft(item_id, "2026-01-05", "2026-01-01", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidDateRange));
    }

    #[tokio::test]
    async fn rejects_empty_draft_and_zero_quantity() {
        let store = test_store().await;
        let item_id = seed_item(&store, dec!(100.00), dec!(0.00)).await;
        let svc = SeaOrmBookingService::new(store);

        let empty = OrderDraft {
            start_date: date("2026-01-01"),
            end_date: date("2026-01-03"),
            lines: vec![],
        };
        assert!(matches!(
            svc.validate_and_quote(&empty).await.unwrap_err(),
            BookingError::EmptyOrder
        ));

        assert!(matches!(
            svc.validate_and_quote(&draft(item_id, "2026-01-01", "2026-01-03", 0))
                .await
                .unwrap_err(),
            BookingError::InvalidQuantity { .. }
        ));
    }

    #[tokio::test]
    async fn overlapping_booking_is_rejected_and_disjoint_allowed() {
        let store = test_store().await;
        let item_id = seed_item(&store, dec!(100.00), dec!(0.00)).await;
        let user_id = seed_user(&store).await;
        let svc = SeaOrmBookingService::new(store);

        svc.create_order(user_id, &draft(item_id, "2026-01-02", "2026-01-04", 1))
            .await
            .unwrap();

        // Shares the 4th with the existing booking.
        let err = svc
            .create_order(user_id, &draft(item_id, "2026-01-04", "2026-01-06", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::ItemUnavailable { item_id: id } if id == item_id));

        // Starts the day after the existing booking ends.
        svc.create_order(user_id, &draft(item_id, "2026-01-05", "2026-01-07", 1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn recompute_total_follows_rate_changes() {
        let store = test_store().await;
        let item_id = seed_item(&store, dec!(100.00), dec!(0.00)).await;
        let user_id = seed_user(&store).await;
        let svc = SeaOrmBookingService::new(store.clone());

        let placed = svc
            .create_order(user_id, &draft(item_id, "2026-01-01", "2026-01-02", 1))
            .await
            .unwrap();
        assert_eq!(placed.order.total_price, dec!(200.00));

        let item = store.get_item(item_id).await.unwrap().unwrap();
        store
            .update_item(
                item_id,
                crate::db::ItemInput {
                    category_id: item.category_id,
                    name: item.name,
                    description: item.description,
                    sizes: item.sizes,
                    daily_rate: dec!(150.00),
                    security_deposit: item.security_deposit,
                    available: item.available,
                },
            )
            .await
            .unwrap();

        let total = svc.recompute_total(placed.order.id).await.unwrap();
        assert_eq!(total, dec!(300.00));

        let reloaded = store.get_order(placed.order.id).await.unwrap().unwrap();
        assert_eq!(reloaded.total_price, dec!(300.00));
    }
}
