// src/models/menu.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::db_utils::Assignments;

// Self-referential navigation tree. A root has `parent_id = NULL`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Menu {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub path: Option<String>,
    pub icon: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MenuTreeNode {
    #[serde(flatten)]
    pub menu: Menu,
    #[schema(no_recursion)]
    pub children: Vec<MenuTreeNode>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMenuPayload {
    pub parent_id: Option<i64>,
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    pub path: Option<String>,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl CreateMenuPayload {
    pub fn assignments(self) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("parent_id", self.parent_id)
            .set("name", self.name)
            .set_opt("path", self.path)
            .set_opt("icon", self.icon)
            .set_opt("sort_order", self.sort_order)
            .set_opt("is_active", self.is_active);
        a
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMenuPayload {
    /// `null` moves the menu back to the root.
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<i64>)]
    pub parent_id: Option<Option<i64>>,
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    pub path: Option<String>,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl UpdateMenuPayload {
    pub fn assignments(self) -> Assignments {
        let mut a = Assignments::new();
        a.set_opt("parent_id", self.parent_id)
            .set_opt("name", self.name)
            .set_opt("path", self.path)
            .set_opt("icon", self.icon)
            .set_opt("sort_order", self.sort_order)
            .set_opt("is_active", self.is_active);
        a
    }
}

/// Builds the active tree from a flat list: roots are active menus without a
/// parent, children are active menus ordered by `sort_order`, then `name`.
/// Children of inactive menus are unreachable and therefore left out.
pub fn build_menu_tree(menus: Vec<Menu>) -> Vec<MenuTreeNode> {
    let mut active: Vec<Menu> = menus.into_iter().filter(|m| m.is_active).collect();
    active.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));

    fn attach(parent: Option<i64>, pool: &[Menu]) -> Vec<MenuTreeNode> {
        pool.iter()
            .filter(|m| m.parent_id == parent)
            .map(|m| MenuTreeNode {
                menu: m.clone(),
                children: attach(Some(m.id), pool),
            })
            .collect()
    }

    attach(None, &active)
}

/// True when hanging `id` under `new_parent` would close a loop, i.e. when
/// `id` is `new_parent` itself or one of its ancestors. `links` holds
/// `(menu id, parent id)` for every menu.
pub fn creates_parent_cycle(id: i64, new_parent: i64, links: &[(i64, Option<i64>)]) -> bool {
    let parents: HashMap<i64, Option<i64>> = links.iter().copied().collect();
    let mut current = Some(new_parent);
    let mut steps = 0;
    while let Some(node) = current {
        if node == id {
            return true;
        }
        steps += 1;
        if steps > parents.len() {
            // an existing loop that does not involve `id`
            return false;
        }
        current = parents.get(&node).copied().flatten();
    }
    false
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::common::db_utils::SqlValue;

    pub(crate) fn menu(id: i64, parent_id: Option<i64>, name: &str, sort_order: i32) -> Menu {
        Menu {
            id,
            parent_id,
            name: name.to_string(),
            path: Some(format!("/{}", name.to_lowercase())),
            icon: None,
            sort_order,
            is_active: true,
            created_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            updated_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn parent_id_distinguishes_absent_from_null() {
        let absent: UpdateMenuPayload = serde_json::from_str(r#"{"name": "Sales"}"#).unwrap();
        assert_eq!(absent.parent_id, None);
        assert!(absent.assignments().get("parent_id").is_none());

        let root: UpdateMenuPayload = serde_json::from_str(r#"{"parent_id": null}"#).unwrap();
        assert_eq!(root.parent_id, Some(None));
        assert_eq!(root.assignments().get("parent_id"), Some(&SqlValue::NullBigInt));

        let moved: UpdateMenuPayload = serde_json::from_str(r#"{"parent_id": 4}"#).unwrap();
        assert_eq!(moved.parent_id, Some(Some(4)));
    }

    #[test]
    fn reparenting_under_a_descendant_is_a_cycle() {
        // 1 -> 2 -> 3, and 4 on its own
        let links = [(1, None), (2, Some(1)), (3, Some(2)), (4, None)];

        assert!(creates_parent_cycle(1, 1, &links));
        assert!(creates_parent_cycle(1, 3, &links));
        assert!(creates_parent_cycle(2, 3, &links));
        assert!(!creates_parent_cycle(3, 1, &links));
        assert!(!creates_parent_cycle(1, 4, &links));
        assert!(!creates_parent_cycle(4, 99, &links));
    }

    #[test]
    fn children_follow_sort_order_then_name() {
        let menus = vec![
            menu(1, None, "Sales", 2),
            menu(2, None, "Masters", 1),
            menu(3, Some(2), "Units", 1),
            menu(4, Some(2), "Categories", 1),
            menu(5, Some(2), "Taxes", 0),
        ];

        let tree = build_menu_tree(menus);
        let roots: Vec<&str> = tree.iter().map(|n| n.menu.name.as_str()).collect();
        assert_eq!(roots, vec!["Masters", "Sales"]);

        let children: Vec<&str> = tree[0].children.iter().map(|n| n.menu.name.as_str()).collect();
        assert_eq!(children, vec!["Taxes", "Categories", "Units"]);
    }

    #[test]
    fn inactive_menus_and_their_subtrees_are_dropped() {
        let mut hidden = menu(2, None, "Hidden", 0);
        hidden.is_active = false;
        let menus = vec![menu(1, None, "Visible", 0), hidden, menu(3, Some(2), "Orphan", 0)];

        let tree = build_menu_tree(menus);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].menu.id, 1);
    }
}
