// src/services/product_service.rs

use sqlx::PgPool;

use crate::{
    common::{
        error::AppError,
        pagination::{Paginated, PageRequest},
    },
    db::ProductRepository,
    models::product::{
        CreateProductPayload, Product, ProductDetail, ProductListParams, ProductSortField,
        ProductWithStock, SortOrder,
    },
};

/// Above this many candidates the in-memory stock path logs a warning.
const LARGE_STOCK_SCAN: usize = 5_000;

#[derive(Clone)]
pub struct ProductService {
    product_repo: ProductRepository,
    pool: PgPool,
}

/// Applies the stock filter and stock ordering to a fully loaded candidate
/// set, then cuts the requested page. `total` is the filtered count before
/// slicing. Ties keep ascending id order.
pub fn paginate_by_stock(
    mut items: Vec<ProductWithStock>,
    stock: Option<i64>,
    sort_by: ProductSortField,
    order: SortOrder,
    req: PageRequest,
) -> (Vec<ProductWithStock>, i64) {
    if let Some(wanted) = stock {
        items.retain(|p| p.total_stock == wanted);
    }

    if sort_by == ProductSortField::Stock {
        items.sort_by(|a, b| {
            let by_stock = match order {
                SortOrder::Asc => a.total_stock.cmp(&b.total_stock),
                SortOrder::Desc => b.total_stock.cmp(&a.total_stock),
            };
            by_stock.then_with(|| a.product.id.cmp(&b.product.id))
        });
    } else {
        sort_in_memory(&mut items, sort_by, order);
    }

    let total = items.len() as i64;
    let page = items
        .into_iter()
        .skip(usize::try_from(req.offset()).unwrap_or(usize::MAX))
        .take(req.limit as usize)
        .collect();
    (page, total)
}

fn sort_in_memory(items: &mut [ProductWithStock], sort_by: ProductSortField, order: SortOrder) {
    items.sort_by(|a, b| {
        let (a, b) = (&a.product, &b.product);
        let ord = match sort_by {
            ProductSortField::Id | ProductSortField::Stock => a.id.cmp(&b.id),
            ProductSortField::Name => a.name.cmp(&b.name),
            ProductSortField::Sku => a.sku.cmp(&b.sku),
            ProductSortField::Price => a.price.cmp(&b.price),
            ProductSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        let ord = match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        };
        ord.then_with(|| a.id.cmp(&b.id))
    });
}

impl ProductService {
    pub fn new(product_repo: ProductRepository, pool: PgPool) -> Self {
        Self { product_repo, pool }
    }

    async fn attach_stock(&self, products: Vec<Product>) -> Result<Vec<ProductWithStock>, AppError> {
        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        let totals = self.product_repo.stock_totals(&ids).await?;

        Ok(products
            .into_iter()
            .map(|product| ProductWithStock {
                total_stock: totals.get(&product.id).copied().unwrap_or(0),
                product,
            })
            .collect())
    }

    pub async fn list_products(
        &self,
        params: &ProductListParams,
    ) -> Result<Paginated<ProductWithStock>, AppError> {
        let req = PageRequest::new(params.page, params.limit);

        if !params.needs_stock_in_memory() {
            let (products, total) = self.product_repo.list_page(params, req).await?;
            let data = self.attach_stock(products).await?;
            return Ok(Paginated::new(data, total, req));
        }

        // Stock is derived, so filtering or sorting on it needs the whole set.
        let candidates = self.product_repo.list_all_matching(params).await?;
        if candidates.len() > LARGE_STOCK_SCAN {
            tracing::warn!(
                candidates = candidates.len(),
                "Stock filter/sort is scanning a large product set in memory"
            );
        }

        let with_stock = self.attach_stock(candidates).await?;
        let (data, total) = paginate_by_stock(
            with_stock,
            params.stock,
            params.sort_by.unwrap_or_default(),
            params.sort_order.unwrap_or_default(),
            req,
        );
        Ok(Paginated::new(data, total, req))
    }

    pub async fn get_product(&self, id: i64) -> Result<ProductDetail, AppError> {
        let product = self
            .product_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;
        let variants = self.product_repo.list_variants(id).await?;
        let total_stock = variants.iter().map(|v| v.stock as i64).sum();

        Ok(ProductDetail {
            product,
            total_stock,
            variants,
        })
    }

    /// Product and its initial variants, all or nothing.
    pub async fn create_product(&self, payload: CreateProductPayload) -> Result<ProductDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let product = self
            .product_repo
            .create(&mut *tx, payload.assignments())
            .await?;

        let mut variants = Vec::with_capacity(payload.variants.len());
        for variant in &payload.variants {
            let created = self
                .product_repo
                .create_variant(&mut *tx, product.id, variant)
                .await?;
            variants.push(created);
        }

        tx.commit().await?;

        tracing::info!(product_id = product.id, variants = variants.len(), "✅ Product created");

        let total_stock = variants.iter().map(|v| v.stock as i64).sum();
        Ok(ProductDetail {
            product,
            total_stock,
            variants,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    fn product(id: i64, stock: i64) -> ProductWithStock {
        ProductWithStock {
            product: Product {
                id,
                name: format!("Product {:02}", id),
                sku: format!("SKU-{}", id),
                description: None,
                category_id: None,
                unit_id: None,
                tax_id: None,
                hsn_code_id: None,
                price: Decimal::new(id * 100, 2),
                image_path: None,
                is_active: true,
                created_at: DateTime::<Utc>::from_timestamp(1_700_000_000 + id, 0).unwrap(),
                updated_at: DateTime::<Utc>::from_timestamp(1_700_000_000 + id, 0).unwrap(),
            },
            total_stock: stock,
        }
    }

    #[test]
    fn zero_stock_sorted_desc_second_page() {
        // 12 products out of stock (odd ids 1..=23), 12 in stock
        let items: Vec<_> = (1..=24)
            .map(|id| product(id, if id % 2 == 1 { 0 } else { id }))
            .collect();

        let (page, total) = paginate_by_stock(
            items,
            Some(0),
            ProductSortField::Stock,
            SortOrder::Desc,
            PageRequest::new(Some(2), Some(5)),
        );

        assert_eq!(total, 12);
        let ids: Vec<i64> = page.iter().map(|p| p.product.id).collect();
        // equal stock, so the tie-break keeps id order: items 6..=10 of the filtered set
        assert_eq!(ids, vec![11, 13, 15, 17, 19]);
        assert!(page.iter().all(|p| p.total_stock == 0));
    }

    #[test]
    fn pages_past_the_end_are_empty() {
        let items: Vec<_> = (1..=3).map(|id| product(id, 0)).collect();

        let (page, total) = paginate_by_stock(
            items,
            Some(0),
            ProductSortField::Stock,
            SortOrder::Asc,
            PageRequest::new(Some(i64::MAX), Some(10)),
        );

        assert_eq!(total, 3);
        assert!(page.is_empty());
    }

    #[test]
    fn stock_sort_orders_by_derived_total() {
        let items = vec![product(1, 5), product(2, 50), product(3, 0), product(4, 20)];

        let (page, total) = paginate_by_stock(
            items,
            None,
            ProductSortField::Stock,
            SortOrder::Desc,
            PageRequest::new(Some(1), Some(10)),
        );

        assert_eq!(total, 4);
        let stocks: Vec<i64> = page.iter().map(|p| p.total_stock).collect();
        assert_eq!(stocks, vec![50, 20, 5, 0]);
    }

    #[test]
    fn stock_filter_with_other_sort_field() {
        let items = vec![product(3, 7), product(1, 7), product(2, 1)];

        let (page, total) = paginate_by_stock(
            items,
            Some(7),
            ProductSortField::Name,
            SortOrder::Desc,
            PageRequest::new(None, None),
        );

        assert_eq!(total, 2);
        let ids: Vec<i64> = page.iter().map(|p| p.product.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn page_past_the_end_is_empty_but_keeps_total() {
        let items: Vec<_> = (1..=3).map(|id| product(id, 0)).collect();
        let (page, total) = paginate_by_stock(
            items,
            Some(0),
            ProductSortField::Stock,
            SortOrder::Asc,
            PageRequest::new(Some(5), Some(10)),
        );
        assert!(page.is_empty());
        assert_eq!(total, 3);
    }
}
