/*
    Hook dispatch through the managers

    Hooks observe every successful mutation in registration order. A failing
    hook is logged and counted but never undoes the mutation or stops the
    hooks registered after it.
*/

use subspaces_core::core_subspaces::{
    DeletePolicy, GroupManager, Permission, PermissionManager, SectionManager, SubspaceManager,
    ROOT_SECTION_ID,
};
use subspaces_core::test_utils::{address, manager_with_subspace, RecordingHook};

#[test]
fn test_hooks_observe_mutations_in_order() {
    let (mut manager, sub, owner) = manager_with_subspace();
    let first = RecordingHook::new("first");
    let second = RecordingHook::sharing("second", &first);
    manager.register_hook(Box::new(first.clone()));
    manager.register_hook(Box::new(second));

    let section = manager
        .create_section(sub, ROOT_SECTION_ID, "Chat".to_string(), String::new(), &owner)
        .unwrap();

    assert_eq!(
        first.events(),
        vec![
            format!("section_saved:{}:{}", sub, section.id),
            format!("section_saved:{}:{}", sub, section.id),
        ]
    );
}

#[test]
fn test_failing_hook_does_not_roll_back() {
    let (mut manager, sub, owner) = manager_with_subspace();
    let failing = RecordingHook::failing("failing");
    let after = RecordingHook::new("after");
    manager.register_hook(Box::new(failing.clone()));
    manager.register_hook(Box::new(after.clone()));

    let user = address(2);
    manager
        .set_user_permissions(sub, ROOT_SECTION_ID, &user, Permission::Write.into(), &owner)
        .unwrap();

    assert!(manager
        .has_permission(sub, ROOT_SECTION_ID, &user, Permission::Write)
        .unwrap());
    assert_eq!(failing.events().len(), 1);
    assert_eq!(after.events(), failing.events());
}

#[test]
fn test_membership_and_acl_hooks() {
    let (mut manager, sub, owner) = manager_with_subspace();
    let group = manager
        .create_user_group(
            sub,
            ROOT_SECTION_ID,
            "Crew".to_string(),
            String::new(),
            Permission::Write.into(),
            &owner,
        )
        .unwrap();

    let hook = RecordingHook::new("audit");
    manager.register_hook(Box::new(hook.clone()));
    let user = address(7);

    manager.add_user_to_group(sub, group.id, &user, &owner).unwrap();
    // Re-adding and removing twice only fire for actual changes
    manager.add_user_to_group(sub, group.id, &user, &owner).unwrap();
    manager.remove_user_from_group(sub, group.id, &user, &owner).unwrap();
    manager.remove_user_from_group(sub, group.id, &user, &owner).unwrap();

    manager
        .set_user_permissions(sub, ROOT_SECTION_ID, &user, Permission::Write.into(), &owner)
        .unwrap();
    manager
        .remove_user_permissions(sub, ROOT_SECTION_ID, &user, &owner)
        .unwrap();

    manager
        .delete_user_group(sub, group.id, DeletePolicy::Reject, &owner)
        .unwrap();

    assert_eq!(
        hook.events(),
        vec![
            format!("group_member_added:{}:{}:{}", sub, group.id, user),
            format!("group_member_removed:{}:{}:{}", sub, group.id, user),
            format!("user_permission_set:{}:0:{}:[WRITE]", sub, user),
            format!("user_permission_removed:{}:0:{}", sub, user),
            format!("group_deleted:{}:{}", sub, group.id),
        ]
    );
}

#[test]
fn test_delete_subspace_fires_once() {
    let (mut manager, sub, owner) = manager_with_subspace();
    let hook = RecordingHook::new("audit");
    manager.register_hook(Box::new(hook.clone()));

    manager.delete_subspace(sub, &owner).unwrap();

    assert_eq!(hook.events(), vec![format!("subspace_deleted:{}", sub)]);
    assert!(manager.list_subspaces().unwrap().is_empty());
}
