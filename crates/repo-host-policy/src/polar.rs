//! Polar rendering of the role table, for hosted policy services.

use crate::role::{Permission, Role};
use crate::{ACTOR_TYPE, RESOURCE_TYPE};

/// File name the rendered policy is registered under.
pub const POLICY_FILE_NAME: &str = "policy.polar";

fn quoted_list<T: AsRef<str>>(items: impl Iterator<Item = T>) -> String {
    items
        .map(|item| format!("\"{}\"", item.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the Polar policy equivalent to [`Role::permissions`].
///
/// Roles do not imply one another; every grant is listed explicitly.
pub fn render_polar() -> String {
    let mut lines = vec![
        format!("actor {ACTOR_TYPE} {{}}"),
        String::new(),
        format!("resource {RESOURCE_TYPE} {{"),
        format!("  roles = [{}];", quoted_list(Role::all())),
        format!("  permissions = [{}];", quoted_list(Permission::all())),
        String::new(),
    ];

    for role in Role::all() {
        for permission in role.permissions().to_vec() {
            lines.push(format!("  \"{permission}\" if \"{role}\";"));
        }
    }

    lines.push("}".to_string());
    lines.push(String::new());
    lines.push(
        "allow(actor, action, resource) if has_permission(actor, action, resource);".to_string(),
    );
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_types_roles_and_permissions() {
        let src = render_polar();
        assert!(src.starts_with("actor User {}\n"));
        assert!(src.contains("resource Repository {"));
        assert!(src.contains("  roles = [\"owner\", \"admin\", \"guest\"];"));
        assert!(src.contains(
            "  permissions = [\"list_directories\", \"create_directory\", \"download_file\", \"upload_file\"];"
        ));
    }

    #[test]
    fn one_rule_per_grant() {
        let src = render_polar();
        let rules = src.lines().filter(|l| l.contains("\" if \"")).count();
        assert_eq!(rules, 10);

        assert!(src.contains("  \"upload_file\" if \"owner\";"));
        assert!(src.contains("  \"create_directory\" if \"admin\";"));
        assert!(src.contains("  \"download_file\" if \"guest\";"));
    }

    #[test]
    fn guest_never_writes() {
        let src = render_polar();
        assert!(!src.contains("\"create_directory\" if \"guest\""));
        assert!(!src.contains("\"upload_file\" if \"guest\""));
    }
}
