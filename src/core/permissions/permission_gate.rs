// Permission gate - decides whether an actor may run a command.
//
// Pure predicate over role names; no I/O, no side effects.

use crate::core::chain::Command;

/// A command with no `perms` is public. Otherwise the actor needs at least
/// one role whose name matches an entry in `perms`, ignoring case.
pub fn authorize(command: &Command, actor_roles: &[String]) -> bool {
    if command.perms.is_empty() {
        return true;
    }

    actor_roles.iter().any(|role| {
        command
            .perms
            .iter()
            .any(|perm| perm.to_lowercase() == role.to_lowercase())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chain::Chain;

    fn command(perms: &[&str]) -> Command {
        Command {
            chain: Chain {
                name: "kick".into(),
                actions: vec![],
            },
            perms: perms.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_empty_perms_is_public() {
        let cmd = command(&[]);
        assert!(authorize(&cmd, &[]));
        assert!(authorize(&cmd, &roles(&["anyone"])));
    }

    #[test]
    fn test_matching_role_is_case_insensitive() {
        let cmd = command(&["Moderator"]);
        assert!(authorize(&cmd, &roles(&["member", "MODERATOR"])));
        assert!(authorize(&cmd, &roles(&["moderator"])));
    }

    #[test]
    fn test_no_matching_role_is_denied() {
        let cmd = command(&["moderator", "admin"]);
        assert!(!authorize(&cmd, &roles(&["member"])));
        assert!(!authorize(&cmd, &[]));
    }

    #[test]
    fn test_order_does_not_matter() {
        let cmd = command(&["b", "a"]);
        let forward = roles(&["x", "a"]);
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(authorize(&cmd, &forward), authorize(&cmd, &backward));
        assert!(authorize(&cmd, &forward));
    }

    #[test]
    fn test_exhaustive_small_role_sets() {
        // Every subset of a small universe: authorized iff the intersection is non-empty.
        let universe = ["admin", "mod", "member", "guest"];
        let cmd = command(&["ADMIN", "Mod"]);
        for mask in 0u8..16 {
            let held: Vec<String> = universe
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, r)| r.to_string())
                .collect();
            let expected = held.iter().any(|r| r == "admin" || r == "mod");
            assert_eq!(authorize(&cmd, &held), expected, "roles {held:?}");
        }
    }
}
