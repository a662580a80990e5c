//! Product, combo, and recipe reads (plus creation helpers for seeding).
//!
//! Catalog maintenance is an external concern; orders only need price/GST
//! snapshots, combo expansion, and recipe rows.

use crate::domain::{Combo, ComboItem, Money, Product, Qty, Recipe};
use sqlx::{Row, SqliteConnection};
use std::collections::HashMap;
use uuid::Uuid;

use super::{parse_money, parse_qty, parse_uuid, Repository};

impl Repository {
    pub async fn create_product(
        &self,
        name: &str,
        price: Money,
        gst_percent: Money,
    ) -> Result<Product, sqlx::Error> {
        let product = Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            gst_percent,
            is_active: true,
        };
        sqlx::query(
            "INSERT INTO products (id, name, price, gst_percent, is_active) VALUES (?, ?, ?, ?, 1)",
        )
        .bind(product.id.to_string())
        .bind(&product.name)
        .bind(product.price.to_canonical_string())
        .bind(product.gst_percent.to_canonical_string())
        .execute(&self.pool)
        .await?;
        Ok(product)
    }

    pub async fn create_combo(
        &self,
        name: &str,
        price: Money,
        gst_percent: Money,
        items: &[(Uuid, i64)],
    ) -> Result<Combo, sqlx::Error> {
        let combo = Combo {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            gst_percent,
        };
        sqlx::query("INSERT INTO combos (id, name, price, gst_percent) VALUES (?, ?, ?, ?)")
            .bind(combo.id.to_string())
            .bind(&combo.name)
            .bind(combo.price.to_canonical_string())
            .bind(combo.gst_percent.to_canonical_string())
            .execute(&self.pool)
            .await?;

        for (product_id, quantity) in items {
            sqlx::query("INSERT INTO combo_items (combo_id, product_id, quantity) VALUES (?, ?, ?)")
                .bind(combo.id.to_string())
                .bind(product_id.to_string())
                .bind(quantity)
                .execute(&self.pool)
                .await?;
        }
        Ok(combo)
    }

    /// Upsert one recipe row for (product, ingredient).
    pub async fn set_recipe(
        &self,
        product_id: Uuid,
        ingredient_id: Uuid,
        quantity: Qty,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO recipes (product_id, ingredient_id, quantity)
            VALUES (?, ?, ?)
            ON CONFLICT(product_id, ingredient_id) DO UPDATE SET quantity = excluded.quantity
            "#,
        )
        .bind(product_id.to_string())
        .bind(ingredient_id.to_string())
        .bind(quantity.to_canonical_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn product_name(&self, id: Uuid) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT name FROM products WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("name")))
    }

    pub async fn combo_name(&self, id: Uuid) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT name FROM combos WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("name")))
    }

    // In-transaction reads used by item pricing and settlement.

    pub(crate) async fn get_product_tx(
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<Product>, sqlx::Error> {
        let row = sqlx::query("SELECT id, name, price, gst_percent, is_active FROM products WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| {
            let id: String = r.get("id");
            let price: String = r.get("price");
            let gst: String = r.get("gst_percent");
            Product {
                id: parse_uuid(&id, "products.id"),
                name: r.get("name"),
                price: parse_money(&price, "products.price"),
                gst_percent: parse_money(&gst, "products.gst_percent"),
                is_active: r.get::<i64, _>("is_active") != 0,
            }
        }))
    }

    pub(crate) async fn get_combo_tx(
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<Combo>, sqlx::Error> {
        let row = sqlx::query("SELECT id, name, price, gst_percent FROM combos WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| {
            let id: String = r.get("id");
            let price: String = r.get("price");
            let gst: String = r.get("gst_percent");
            Combo {
                id: parse_uuid(&id, "combos.id"),
                name: r.get("name"),
                price: parse_money(&price, "combos.price"),
                gst_percent: parse_money(&gst, "combos.gst_percent"),
            }
        }))
    }

    pub(crate) async fn get_combo_items_tx(
        conn: &mut SqliteConnection,
        combo_id: Uuid,
    ) -> Result<Vec<ComboItem>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT combo_id, product_id, quantity FROM combo_items WHERE combo_id = ? ORDER BY product_id",
        )
        .bind(combo_id.to_string())
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows
            .iter()
            .map(|r| {
                let combo: String = r.get("combo_id");
                let product: String = r.get("product_id");
                ComboItem {
                    combo_id: parse_uuid(&combo, "combo_items.combo_id"),
                    product_id: parse_uuid(&product, "combo_items.product_id"),
                    quantity: r.get("quantity"),
                }
            })
            .collect())
    }

    pub(crate) async fn get_product_name_tx(
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT name FROM products WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| r.get("name")))
    }

    /// Recipes for a product set, keyed by product id. Products without any
    /// recipe rows are simply absent from the map; the resolver treats that
    /// as a missing-recipe error.
    pub(crate) async fn recipes_for_products_tx(
        conn: &mut SqliteConnection,
        product_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Recipe>>, sqlx::Error> {
        let mut map: HashMap<Uuid, Vec<Recipe>> = HashMap::new();
        for product_id in product_ids {
            let rows = sqlx::query(
                "SELECT product_id, ingredient_id, quantity FROM recipes WHERE product_id = ? ORDER BY ingredient_id",
            )
            .bind(product_id.to_string())
            .fetch_all(&mut *conn)
            .await?;
            if rows.is_empty() {
                continue;
            }
            let recipes = rows
                .iter()
                .map(|r| {
                    let product: String = r.get("product_id");
                    let ingredient: String = r.get("ingredient_id");
                    let qty: String = r.get("quantity");
                    Recipe {
                        product_id: parse_uuid(&product, "recipes.product_id"),
                        ingredient_id: parse_uuid(&ingredient, "recipes.ingredient_id"),
                        quantity: parse_qty(&qty, "recipes.quantity"),
                    }
                })
                .collect();
            map.insert(*product_id, recipes);
        }
        Ok(map)
    }
}
