// src/services/quotation_service.rs

use std::collections::HashSet;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    common::{
        db_utils::Assignments,
        error::AppError,
        pagination::non_blank,
    },
    db::{QuotationRepository, SeriesRepository},
    models::{
        employee::parse_form_date,
        quotation::{
            CreateQuotationPayload, PricedItem, QuotationDetail, QuotationItemPayload,
            UpdateQuotationPayload, MAX_MONEY,
        },
    },
};

#[derive(Clone)]
pub struct QuotationService {
    quotation_repo: QuotationRepository,
    series_repo: SeriesRepository,
    pool: PgPool,
}

// ---
// Pricing
// ---

fn amount_too_large() -> AppError {
    AppError::invalid_field("items", "The quotation amount is too large.")
}

/// `quantity * rate - discount`, plus `tax_rate` percent on top, rounded to
/// two places. A discount larger than the gross amount floors at zero.
pub fn price_item(item: &QuotationItemPayload) -> Result<PricedItem, AppError> {
    let gross = item
        .quantity
        .checked_mul(item.rate)
        .ok_or_else(amount_too_large)?;
    let net = gross
        .checked_sub(item.discount)
        .ok_or_else(amount_too_large)?
        .max(Decimal::ZERO);
    let tax = net
        .checked_mul(item.tax_rate)
        .ok_or_else(amount_too_large)?
        / Decimal::ONE_HUNDRED;
    let amount = net.checked_add(tax).ok_or_else(amount_too_large)?.round_dp(2);
    if amount >= Decimal::from(MAX_MONEY) {
        return Err(amount_too_large());
    }

    Ok(PricedItem {
        id: item.id,
        product_id: item.product_id,
        product_variant_id: item.product_variant_id,
        description: non_blank(item.description.as_deref()).map(str::to_string),
        quantity: item.quantity,
        rate: item.rate,
        discount: item.discount,
        tax_rate: item.tax_rate,
        amount,
    })
}

/// Sum of line amounts, bounded by the header's money column.
pub fn sum_amounts(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal, AppError> {
    let total = amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .ok_or_else(amount_too_large)?;
    if total >= Decimal::from(MAX_MONEY) {
        return Err(amount_too_large());
    }
    Ok(total)
}

pub fn total_of(items: &[PricedItem]) -> Result<Decimal, AppError> {
    sum_amounts(items.iter().map(|i| i.amount))
}

// ---
// Item synchronization
// ---

/// What to do with the stored item set so that it ends up matching the
/// incoming list exactly.
#[derive(Debug, Default, PartialEq)]
pub struct ItemSyncPlan {
    pub updates: Vec<(i64, PricedItem)>,
    pub inserts: Vec<PricedItem>,
    pub deletes: Vec<i64>,
}

/// Items with an id are updated, items without one are inserted and stored
/// items missing from the list are deleted. An id that is not one of the
/// quotation's items (or appears twice) rejects the whole plan.
pub fn plan_item_sync(existing_ids: &[i64], incoming: Vec<PricedItem>) -> Result<ItemSyncPlan, AppError> {
    let existing: HashSet<i64> = existing_ids.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut plan = ItemSyncPlan::default();

    for item in incoming {
        match item.id {
            Some(id) => {
                if !existing.contains(&id) {
                    return Err(AppError::BadRequest(format!(
                        "Item {} does not belong to this quotation.",
                        id
                    )));
                }
                if !seen.insert(id) {
                    return Err(AppError::BadRequest(format!("Item {} is listed twice.", id)));
                }
                plan.updates.push((id, item));
            }
            None => plan.inserts.push(item),
        }
    }

    plan.deletes = existing_ids
        .iter()
        .copied()
        .filter(|id| !seen.contains(id))
        .collect();

    Ok(plan)
}

impl QuotationService {
    pub fn new(quotation_repo: QuotationRepository, series_repo: SeriesRepository, pool: PgPool) -> Self {
        Self {
            quotation_repo,
            series_repo,
            pool,
        }
    }

    pub async fn get_quotation(&self, id: i64) -> Result<QuotationDetail, AppError> {
        let quotation = self
            .quotation_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("Quotation"))?;
        let items = self.quotation_repo.list_items(&self.pool, id).await?;
        Ok(QuotationDetail { quotation, items })
    }

    /// Header and items in one transaction. With a series, the number is
    /// taken from it inside the same transaction.
    pub async fn create_quotation(&self, payload: CreateQuotationPayload) -> Result<QuotationDetail, AppError> {
        let quotation_date = parse_form_date("quotation_date", payload.quotation_date.as_deref())?
            .unwrap_or_else(|| Utc::now().date_naive());
        let valid_until = parse_form_date("valid_until", payload.valid_until.as_deref())?;

        let priced = payload
            .items
            .iter()
            .map(price_item)
            .collect::<Result<Vec<_>, _>>()?;
        let total = total_of(&priced)?;

        let mut tx = self.pool.begin().await?;

        // 1. Number
        let quotation_no = match (payload.series_id, non_blank(payload.quotation_no.as_deref())) {
            (Some(series_id), _) => {
                let series = self
                    .series_repo
                    .take_next_number(&mut *tx, series_id)
                    .await?
                    .ok_or_else(|| AppError::BadRequest("Series not found or inactive.".into()))?;
                series.format_number(series.next_number)
            }
            (None, Some(manual)) => manual.to_string(),
            (None, None) => {
                return Err(AppError::BadRequest(
                    "Either series_id or quotation_no is required.".into(),
                ));
            }
        };

        // 2. Header
        let mut header = Assignments::new();
        header
            .set("quotation_no", quotation_no)
            .set_opt("series_id", payload.series_id)
            .set_opt("customer_id", payload.customer_id)
            .set("quotation_date", quotation_date)
            .set_opt("valid_until", valid_until)
            .set_opt("status", non_blank(payload.status.as_deref()))
            .set_opt("notes", payload.notes)
            .set("total_amount", total);
        let quotation = self.quotation_repo.insert_header(&mut *tx, header).await?;

        // 3. Items, stamped with the new header id
        let items = self
            .quotation_repo
            .insert_items(&mut *tx, quotation.id, &priced)
            .await?;

        tx.commit().await?;

        tracing::info!(
            quotation_id = quotation.id,
            quotation_no = %quotation.quotation_no,
            items = items.len(),
            "✅ Quotation created"
        );

        Ok(QuotationDetail { quotation, items })
    }

    pub async fn update_quotation(
        &self,
        id: i64,
        payload: UpdateQuotationPayload,
    ) -> Result<QuotationDetail, AppError> {
        let quotation_date = parse_form_date("quotation_date", payload.quotation_date.as_deref())?;
        let valid_until = parse_form_date("valid_until", payload.valid_until.as_deref())?;

        let mut header = Assignments::new();
        header
            .set_opt("customer_id", payload.customer_id)
            .set_opt("quotation_date", quotation_date)
            .set_opt("valid_until", valid_until)
            .set_opt("status", payload.status)
            .set_opt("notes", payload.notes);

        let mut tx = self.pool.begin().await?;

        let mut quotation = self
            .quotation_repo
            .update_header(&mut *tx, id, header)
            .await?
            .ok_or_else(|| AppError::not_found("Quotation"))?;

        if let Some(incoming) = payload.items {
            let existing = self.quotation_repo.item_ids(&mut *tx, id).await?;
            let priced = incoming
                .iter()
                .map(price_item)
                .collect::<Result<Vec<_>, _>>()?;
            let plan = plan_item_sync(&existing, priced)?;

            self.quotation_repo
                .delete_items(&mut *tx, id, &plan.deletes)
                .await?;
            for (item_id, item) in &plan.updates {
                self.quotation_repo
                    .update_item(&mut *tx, id, *item_id, item)
                    .await?;
            }
            self.quotation_repo
                .insert_items(&mut *tx, id, &plan.inserts)
                .await?;

            let current = self.quotation_repo.list_items(&mut *tx, id).await?;
            let total = sum_amounts(current.iter().map(|i| i.amount))?;
            quotation = self.quotation_repo.set_total(&mut *tx, id, total).await?;

            tracing::info!(
                quotation_id = id,
                updated = plan.updates.len(),
                inserted = plan.inserts.len(),
                deleted = plan.deletes.len(),
                "Quotation items synchronized"
            );
        }

        let items = self.quotation_repo.list_items(&mut *tx, id).await?;
        tx.commit().await?;

        Ok(QuotationDetail { quotation, items })
    }

    /// Returns the attachment path of the deleted quotation, if any.
    pub async fn delete_quotation(&self, id: i64) -> Result<Option<String>, AppError> {
        let mut tx = self.pool.begin().await?;

        self.quotation_repo.delete_all_items(&mut *tx, id).await?;
        let deleted = self
            .quotation_repo
            .delete_header(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Quotation"))?;

        tx.commit().await?;
        Ok(deleted.attachment_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(id: Option<i64>, qty: &str, rate: &str) -> QuotationItemPayload {
        QuotationItemPayload {
            id,
            product_id: Some(1),
            product_variant_id: None,
            description: None,
            quantity: dec(qty),
            rate: dec(rate),
            discount: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
        }
    }

    #[test]
    fn amounts_apply_discount_then_tax() {
        let mut item = line(None, "2", "150.00");
        item.discount = dec("50");
        item.tax_rate = dec("18");
        // (300 - 50) * 1.18
        assert_eq!(price_item(&item).unwrap().amount, dec("295.00"));

        let mut free = line(None, "1", "10");
        free.discount = dec("25");
        assert_eq!(price_item(&free).unwrap().amount, Decimal::ZERO);
    }

    #[test]
    fn oversized_lines_are_rejected_instead_of_overflowing() {
        let overflowing = line(None, "79228162514264337593543950335", "2");
        assert!(matches!(
            price_item(&overflowing),
            Err(AppError::InvalidField { ref field, .. }) if field == "items"
        ));

        // fits Decimal but not the NUMERIC(14, 2) amount column
        let too_big = line(None, "99999999999", "999999999999");
        assert!(price_item(&too_big).is_err());

        let lines = [dec("600000000000"), dec("600000000000")];
        assert!(sum_amounts(lines).is_err());
        assert_eq!(sum_amounts([dec("1.25"), dec("2")]).unwrap(), dec("3.25"));
    }

    #[test]
    fn total_sums_line_amounts() {
        let items: Vec<_> = [line(None, "1", "10.50"), line(None, "3", "2")]
            .iter()
            .map(|l| price_item(l).unwrap())
            .collect();
        assert_eq!(total_of(&items).unwrap(), dec("16.50"));
    }

    #[test]
    fn sync_turns_abc_into_a_prime_and_d() {
        // stored: A=1, B=2, C=3; incoming: A' (id 1, changed) and D (new)
        let incoming = vec![
            price_item(&line(Some(1), "5", "20")).unwrap(),
            price_item(&line(None, "1", "99")).unwrap(),
        ];

        let plan = plan_item_sync(&[1, 2, 3], incoming).unwrap();

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].0, 1);
        assert_eq!(plan.updates[0].1.amount, dec("100.00"));
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].rate, dec("99"));
        assert_eq!(plan.deletes, vec![2, 3]);
    }

    #[test]
    fn foreign_item_ids_reject_the_sync() {
        let incoming = vec![price_item(&line(Some(42), "1", "1")).unwrap()];
        assert!(matches!(
            plan_item_sync(&[1, 2], incoming),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn duplicate_item_ids_reject_the_sync() {
        let incoming = vec![
            price_item(&line(Some(1), "1", "1")).unwrap(),
            price_item(&line(Some(1), "2", "1")).unwrap(),
        ];
        assert!(plan_item_sync(&[1], incoming).is_err());
    }

    #[test]
    fn empty_list_deletes_everything() {
        let plan = plan_item_sync(&[4, 5], Vec::new()).unwrap();
        assert_eq!(plan.deletes, vec![4, 5]);
        assert!(plan.updates.is_empty() && plan.inserts.is_empty());
    }
}
