// src/services/rbac_service.rs

use std::collections::{HashMap, HashSet};

use serde_json::{json, Map, Value};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{MenuRepository, RbacRepository},
    models::{
        menu::{build_menu_tree, MenuTreeNode},
        rbac::{MenuPermission, PermissionMap, RolePermissionsResponse, SavedPermissionsResponse},
    },
};

#[derive(Clone)]
pub struct RbacService {
    rbac_repo: RbacRepository,
    menu_repo: MenuRepository,
    pool: PgPool,
}

// ---
// Pure helpers
// ---

/// Rewrites every key to the id string of the menu it names. Numeric keys
/// must be ids of existing menus, other keys are looked up by menu name.
/// Any key that resolves to nothing rejects the whole map.
pub fn normalize_permission_keys(
    incoming: PermissionMap,
    menus: &[(i64, String)],
) -> Result<PermissionMap, AppError> {
    let ids: HashSet<i64> = menus.iter().map(|(id, _)| *id).collect();
    let by_name: HashMap<&str, i64> = menus.iter().map(|(id, name)| (name.as_str(), *id)).collect();

    let mut normalized = PermissionMap::new();
    let mut unknown = Vec::new();

    for (key, flags) in incoming {
        let trimmed = key.trim();
        let resolved = match trimmed.parse::<i64>() {
            Ok(id) => ids.contains(&id).then_some(id),
            Err(_) => by_name.get(trimmed).copied(),
        };
        match resolved {
            Some(id) => {
                normalized.insert(id.to_string(), flags);
            }
            None => unknown.push(key),
        }
    }

    if !unknown.is_empty() {
        return Err(AppError::UnknownPermissionKeys(unknown));
    }
    Ok(normalized)
}

/// Walks the menu tree and attaches each node's flags. Lookup is by id
/// first, then by name for matrices saved before keys were normalized.
pub fn compose_permission_tree(nodes: &[MenuTreeNode], stored: &PermissionMap) -> Vec<Value> {
    nodes.iter().map(|node| compose_node(node, stored)).collect()
}

fn compose_node(node: &MenuTreeNode, stored: &PermissionMap) -> Value {
    let menu = &node.menu;
    let permissions = stored
        .get(&menu.id.to_string())
        .or_else(|| stored.get(&menu.name))
        .copied()
        .unwrap_or_default();
    let children = compose_permission_tree(&node.children, stored);

    match serde_json::to_value(menu) {
        Ok(Value::Object(mut fields)) => {
            fields.insert("permissions".into(), permission_value(permissions));
            fields.insert("children".into(), Value::Array(children));
            Value::Object(fields)
        }
        other => {
            if let Err(e) = other {
                tracing::warn!(menu_id = menu.id, "Menu could not be serialized: {}", e);
            }
            let mut fields = Map::new();
            fields.insert("id".into(), json!(menu.id));
            fields.insert("permissions".into(), permission_value(MenuPermission::default()));
            fields.insert("children".into(), Value::Array(Vec::new()));
            Value::Object(fields)
        }
    }
}

fn permission_value(flags: MenuPermission) -> Value {
    serde_json::to_value(flags).unwrap_or_else(|_| json!({}))
}

impl RbacService {
    pub fn new(rbac_repo: RbacRepository, menu_repo: MenuRepository, pool: PgPool) -> Self {
        Self {
            rbac_repo,
            menu_repo,
            pool,
        }
    }

    pub async fn permission_tree(&self, role_id: i64) -> Result<RolePermissionsResponse, AppError> {
        // 1. Role must be live
        self.rbac_repo
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::not_found("Role"))?;

        // 2. Stored matrix, empty when none was ever saved
        let stored = self
            .rbac_repo
            .find_permissions(role_id)
            .await?
            .map(|row| row.permissions.0)
            .unwrap_or_default();

        // 3. Active tree with flags overlaid
        let tree = build_menu_tree(self.menu_repo.list_active().await?);
        let menus = compose_permission_tree(&tree, &stored);

        Ok(RolePermissionsResponse { role_id, menus })
    }

    pub async fn save_permissions(
        &self,
        role_id: i64,
        incoming: PermissionMap,
    ) -> Result<SavedPermissionsResponse, AppError> {
        self.rbac_repo
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::not_found("Role"))?;

        let menus = self.menu_repo.id_name_pairs().await?;
        let normalized = normalize_permission_keys(incoming, &menus)?;

        let placeholder = self
            .menu_repo
            .any_active_id()
            .await?
            .ok_or_else(|| AppError::BadRequest("No active menu exists yet; create a menu first.".into()))?;

        let mut tx = self.pool.begin().await?;
        let saved = self
            .rbac_repo
            .save_permissions(&mut *tx, role_id, placeholder, &normalized)
            .await?;
        tx.commit().await?;

        tracing::info!(role_id, menus = saved.permissions.0.len(), "Role permissions replaced");

        Ok(SavedPermissionsResponse {
            role_id,
            permissions: saved.permissions.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::menu::tests::menu;

    fn flags(view: bool, create: bool) -> MenuPermission {
        MenuPermission {
            can_view: view,
            can_create: create,
            ..Default::default()
        }
    }

    fn catalog() -> Vec<(i64, String)> {
        vec![(1, "Masters".into()), (2, "Units".into()), (3, "Sales".into())]
    }

    #[test]
    fn mixed_keys_all_become_ids() {
        let mut incoming = PermissionMap::new();
        incoming.insert("1".into(), flags(true, false));
        incoming.insert("Units".into(), flags(true, true));

        let normalized = normalize_permission_keys(incoming, &catalog()).unwrap();
        let keys: Vec<&str> = normalized.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["1", "2"]);
        assert!(normalized["2"].can_create);
    }

    #[test]
    fn unknown_keys_reject_the_whole_map() {
        let mut incoming = PermissionMap::new();
        incoming.insert("1".into(), flags(true, false));
        incoming.insert("99".into(), flags(true, false));
        incoming.insert("Reports".into(), flags(true, false));

        match normalize_permission_keys(incoming, &catalog()) {
            Err(AppError::UnknownPermissionKeys(keys)) => {
                assert_eq!(keys, vec!["99".to_string(), "Reports".to_string()])
            }
            other => panic!("unexpected result: {:?}", other.map(|m| m.len())),
        }
    }

    fn tree() -> Vec<MenuTreeNode> {
        build_menu_tree(vec![
            menu(1, None, "Masters", 0),
            menu(2, Some(1), "Units", 0),
            menu(3, None, "Sales", 1),
        ])
    }

    #[test]
    fn no_stored_matrix_means_all_false() {
        let composed = compose_permission_tree(&tree(), &PermissionMap::new());

        fn all_false(node: &Value) -> bool {
            let p = &node["permissions"];
            ["can_view", "can_create", "can_update", "can_delete", "can_all"]
                .iter()
                .all(|k| p[k] == false)
                && node["children"].as_array().unwrap().iter().all(all_false)
        }
        assert_eq!(composed.len(), 2);
        assert!(composed.iter().all(all_false));
    }

    #[test]
    fn legacy_name_keys_are_still_honoured() {
        let mut stored = PermissionMap::new();
        stored.insert("1".into(), flags(true, false));
        stored.insert("Units".into(), flags(true, true));

        let composed = compose_permission_tree(&tree(), &stored);
        assert_eq!(composed[0]["permissions"]["can_view"], true);
        assert_eq!(composed[0]["children"][0]["name"], "Units");
        assert_eq!(composed[0]["children"][0]["permissions"]["can_create"], true);
        assert_eq!(composed[1]["permissions"]["can_view"], false);
    }

    #[test]
    fn composition_is_byte_identical_across_calls() {
        let mut stored = PermissionMap::new();
        stored.insert("3".into(), flags(true, true));
        stored.insert("2".into(), flags(false, true));

        let first = serde_json::to_string(&compose_permission_tree(&tree(), &stored)).unwrap();
        let second = serde_json::to_string(&compose_permission_tree(&tree(), &stored)).unwrap();
        assert_eq!(first, second);
    }
}
