//! Recipe resolver: maps sold units to aggregated ingredient consumption.

use crate::domain::{Qty, Recipe};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use uuid::Uuid;

/// A product-quantity pair after combo expansion. Combo lines contribute one
/// unit per component with quantity = combo_item_qty × combo_qty_sold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoldUnit {
    pub product_id: Uuid,
    /// Carried along so errors can name the product.
    pub product_name: String,
    pub quantity: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// A sold product (or combo component) has no recipe rows at all. This is
    /// a hard stop: skipping it would allow stock-free sales of items that
    /// should consume inventory.
    #[error("No recipe for {0}")]
    MissingRecipe(String),
}

/// Aggregate ingredient requirements across all sold units.
///
/// Returns a map keyed by ingredient id in sorted order, so callers that
/// check-and-deduct stock always visit ingredients deterministically.
///
/// # Errors
/// Returns `ResolveError::MissingRecipe` if any sold product has no recipes.
pub fn resolve_consumption(
    units: &[SoldUnit],
    recipes_by_product: &HashMap<Uuid, Vec<Recipe>>,
) -> Result<BTreeMap<Uuid, Qty>, ResolveError> {
    let mut usage: BTreeMap<Uuid, Qty> = BTreeMap::new();

    for unit in units {
        let recipes = recipes_by_product
            .get(&unit.product_id)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ResolveError::MissingRecipe(unit.product_name.clone()))?;

        for recipe in recipes {
            let required = recipe.quantity.times(unit.quantity);
            let entry = usage.entry(recipe.ingredient_id).or_insert_with(Qty::zero);
            *entry = *entry + required;
        }
    }

    Ok(usage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn recipe(product: Uuid, ingredient: Uuid, qty: &str) -> Recipe {
        Recipe {
            product_id: product,
            ingredient_id: ingredient,
            quantity: Qty::from_str(qty).unwrap(),
        }
    }

    #[test]
    fn test_single_product_scales_by_quantity() {
        let tea = Uuid::new_v4();
        let sugar = Uuid::new_v4();
        let mut recipes = HashMap::new();
        recipes.insert(tea, vec![recipe(tea, sugar, "0.010")]);

        let units = vec![SoldUnit {
            product_id: tea,
            product_name: "TEA".to_string(),
            quantity: 500,
        }];

        let usage = resolve_consumption(&units, &recipes).unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[&sugar].to_canonical_string(), "5.000");
    }

    #[test]
    fn test_shared_ingredient_aggregates_across_units() {
        let tea = Uuid::new_v4();
        let coffee = Uuid::new_v4();
        let sugar = Uuid::new_v4();
        let milk = Uuid::new_v4();
        let mut recipes = HashMap::new();
        recipes.insert(tea, vec![recipe(tea, sugar, "0.010")]);
        recipes.insert(
            coffee,
            vec![recipe(coffee, sugar, "0.015"), recipe(coffee, milk, "0.100")],
        );

        let units = vec![
            SoldUnit {
                product_id: tea,
                product_name: "TEA".to_string(),
                quantity: 2,
            },
            SoldUnit {
                product_id: coffee,
                product_name: "COFFEE".to_string(),
                quantity: 4,
            },
        ];

        let usage = resolve_consumption(&units, &recipes).unwrap();
        // 2*0.010 + 4*0.015 = 0.080
        assert_eq!(usage[&sugar].to_canonical_string(), "0.080");
        assert_eq!(usage[&milk].to_canonical_string(), "0.400");
    }

    #[test]
    fn test_missing_recipe_is_hard_error() {
        let tea = Uuid::new_v4();
        let recipes = HashMap::new();

        let units = vec![SoldUnit {
            product_id: tea,
            product_name: "TEA".to_string(),
            quantity: 1,
        }];

        let err = resolve_consumption(&units, &recipes).unwrap_err();
        assert_eq!(err, ResolveError::MissingRecipe("TEA".to_string()));
    }

    #[test]
    fn test_empty_recipe_list_counts_as_missing() {
        let tea = Uuid::new_v4();
        let mut recipes = HashMap::new();
        recipes.insert(tea, Vec::new());

        let units = vec![SoldUnit {
            product_id: tea,
            product_name: "TEA".to_string(),
            quantity: 1,
        }];

        assert!(resolve_consumption(&units, &recipes).is_err());
    }

    #[test]
    fn test_no_units_resolves_empty() {
        let usage = resolve_consumption(&[], &HashMap::new()).unwrap();
        assert!(usage.is_empty());
    }
}
