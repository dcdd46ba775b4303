//! Role Service integration tests against the in-memory repository.

use std::sync::Arc;

use rk_platform::{
    InMemoryRoleRepository, PlatformError, RoleObject, RoleRepository, RoleService,
    RoleServiceConfig, UniquenessCheck,
};

fn service_with(config: RoleServiceConfig) -> (RoleService, Arc<InMemoryRoleRepository>) {
    let repo = Arc::new(InMemoryRoleRepository::new());
    let service = RoleService::new(repo.clone(), config);
    (service, repo)
}

fn service() -> RoleService {
    service_with(RoleServiceConfig::default()).0
}

fn assert_bad_request(err: PlatformError, expected: &str) {
    match err {
        PlatformError::BadRequest { message } => assert_eq!(message, expected),
        other => panic!("expected BadRequest({expected}), got {other:?}"),
    }
}

fn assert_not_found(err: PlatformError, expected: &str) {
    match err {
        PlatformError::NotFound { message } => assert_eq!(message, expected),
        other => panic!("expected NotFound({expected}), got {other:?}"),
    }
}

/// An id that is well-formed but names no role.
fn unknown_id() -> String {
    bson::oid::ObjectId::new().to_hex()
}

mod create {
    use super::*;

    #[tokio::test]
    async fn test_created_role_is_findable() {
        let svc = service();
        let created = svc.create_role("admin", "Administrator").await.unwrap();
        assert!(!created.role_id.is_empty());
        assert!(created.sub_roles.is_empty());

        let by_name = svc.find_role_by_name("admin").await.unwrap();
        let by_label = svc.find_role_by_label("Administrator").await.unwrap();
        assert_eq!(by_name, created);
        assert_eq!(by_label, created);
    }

    #[tokio::test]
    async fn test_blank_input_is_bad_arguments() {
        let svc = service();
        assert_bad_request(svc.create_role("", "Label").await.unwrap_err(), "Bad arguments.");
        assert_bad_request(svc.create_role("name", "  ").await.unwrap_err(), "Bad arguments.");
    }

    #[tokio::test]
    async fn test_precheck_duplicate_name_is_conflict() {
        let svc = service();
        svc.create_role("admin", "Administrator").await.unwrap();

        match svc.create_role("admin", "Other").await.unwrap_err() {
            PlatformError::Conflict { message } => assert_eq!(message, "Role admin already exists"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_precheck_duplicate_label_is_conflict() {
        let svc = service();
        svc.create_role("admin", "Administrator").await.unwrap();

        match svc.create_role("root", "Administrator").await.unwrap_err() {
            PlatformError::Conflict { message } => {
                assert_eq!(message, "Role with label Administrator already exists")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_store_index_duplicate_surfaces_unclassified() {
        let (svc, repo) = service_with(RoleServiceConfig {
            uniqueness: UniquenessCheck::StoreIndex,
            ..Default::default()
        });
        svc.create_role("admin", "Administrator").await.unwrap();

        let err = svc.create_role("admin", "Other").await.unwrap_err();
        assert!(matches!(err, PlatformError::DuplicateKey { ref field, .. } if field == "name"));
        assert_eq!(err.status_code().as_u16(), 500);

        let err = svc.create_role("root", "Administrator").await.unwrap_err();
        assert!(matches!(err, PlatformError::DuplicateKey { ref field, .. } if field == "label"));

        assert_eq!(repo.count().await.unwrap(), 1);
    }
}

mod lookup {
    use super::*;

    #[tokio::test]
    async fn test_get_role_unknown_id() {
        let svc = service();
        assert_not_found(svc.get_role(&unknown_id()).await.unwrap_err(), "Role not found.");
    }

    #[tokio::test]
    async fn test_malformed_id_is_not_found() {
        let svc = service();
        assert_not_found(svc.get_role("not-an-object-id").await.unwrap_err(), "Role not found.");
    }

    #[tokio::test]
    async fn test_find_by_name_and_label_miss() {
        let svc = service();
        assert_not_found(svc.find_role_by_name("ghost").await.unwrap_err(), "Could not find Role");
        assert_not_found(svc.find_role_by_label("Ghost").await.unwrap_err(), "Could not find Role");
    }

    #[tokio::test]
    async fn test_blank_role_id_is_bad_arguments() {
        let svc = service();
        assert_bad_request(svc.get_role(" ").await.unwrap_err(), "Bad arguments.");
    }
}

mod pagination {
    use super::*;

    async fn seeded(n: usize) -> RoleService {
        let svc = service();
        for i in 0..n {
            svc.create_role(&format!("role{i:02}"), &format!("Role {i:02}")).await.unwrap();
        }
        svc
    }

    fn names(roles: &[RoleObject]) -> Vec<String> {
        roles.iter().map(|r| r.name.clone()).collect()
    }

    #[tokio::test]
    async fn test_twenty_roles_seven_per_page() {
        let svc = seeded(20).await;

        let first = svc.get_roles(1, 7).await.unwrap();
        assert_eq!(first.page_count, 3);
        assert_eq!(
            names(&first.roles),
            (0..7).map(|i| format!("role{i:02}")).collect::<Vec<_>>()
        );

        let last = svc.get_roles(3, 7).await.unwrap();
        assert_eq!(last.page_count, 3);
        assert_eq!(
            names(&last.roles),
            (14..20).map(|i| format!("role{i:02}")).collect::<Vec<_>>()
        );

        assert_bad_request(svc.get_roles(4, 7).await.unwrap_err(), "Pagination out of bounds.");
    }

    #[tokio::test]
    async fn test_non_positive_page_is_out_of_bounds() {
        let svc = seeded(3).await;
        assert_bad_request(svc.get_roles(0, 2).await.unwrap_err(), "Pagination out of bounds.");
        assert_bad_request(svc.get_roles(-1, 2).await.unwrap_err(), "Pagination out of bounds.");
    }

    #[tokio::test]
    async fn test_non_positive_per_page_is_bad_arguments() {
        let svc = seeded(3).await;
        assert_bad_request(svc.get_roles(1, 0).await.unwrap_err(), "Bad arguments.");
    }

    #[tokio::test]
    async fn test_exact_boundary_page() {
        let svc = seeded(14).await;
        let page = svc.get_roles(2, 7).await.unwrap();
        assert_eq!(page.page_count, 2);
        assert_eq!(page.roles.len(), 7);
        assert_bad_request(svc.get_roles(3, 7).await.unwrap_err(), "Pagination out of bounds.");
    }

    #[tokio::test]
    async fn test_huge_page_does_not_overflow() {
        let svc = seeded(1).await;
        assert_bad_request(
            svc.get_roles(i64::MAX, i64::MAX).await.unwrap_err(),
            "Pagination out of bounds.",
        );
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn test_label_only_update_keeps_name() {
        let svc = service();
        let role = svc.create_role("admin", "Administrator").await.unwrap();

        let updated = svc
            .update_role_informations(&role.role_id, None, Some("Admins"))
            .await
            .unwrap();
        assert_eq!(updated.name, "admin");
        assert_eq!(updated.label, "Admins");
        assert_eq!(svc.get_role(&role.role_id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_no_fields_leaves_role_untouched() {
        let svc = service();
        let role = svc.create_role("admin", "Administrator").await.unwrap();

        let updated = svc.update_role_informations(&role.role_id, None, None).await.unwrap();
        assert_eq!(updated, role);

        let updated = svc
            .update_role_informations(&role.role_id, Some(""), Some("  "))
            .await
            .unwrap();
        assert_eq!(updated, role);
        assert_eq!(svc.get_role(&role.role_id).await.unwrap(), role);
    }

    #[tokio::test]
    async fn test_update_to_taken_name_is_conflict() {
        let svc = service();
        svc.create_role("admin", "Administrator").await.unwrap();
        let other = svc.create_role("viewer", "Viewer").await.unwrap();

        let err = svc
            .update_role_informations(&other.role_id, Some("admin"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Conflict { .. }));
        assert_eq!(svc.get_role(&other.role_id).await.unwrap().name, "viewer");
    }

    #[tokio::test]
    async fn test_update_unknown_role() {
        let svc = service();
        let err = svc
            .update_role_informations(&unknown_id(), Some("x"), None)
            .await
            .unwrap_err();
        assert_not_found(err, "Role not found.");
    }
}

mod update_interleaving {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bson::oid::ObjectId;
    use rk_platform::Role;

    enum Membership {
        Add(ObjectId, ObjectId),
        Remove(ObjectId, ObjectId),
    }

    /// Applies a queued membership change right before the next info update,
    /// as a concurrent request would.
    #[derive(Default)]
    struct InterleavingRepository {
        inner: InMemoryRoleRepository,
        queued: Mutex<Option<Membership>>,
    }

    impl InterleavingRepository {
        fn queue(&self, change: Membership) {
            *self.queued.lock().unwrap() = Some(change);
        }
    }

    #[async_trait]
    impl RoleRepository for InterleavingRepository {
        async fn insert(&self, role: Role) -> rk_platform::Result<Role> {
            self.inner.insert(role).await
        }

        async fn find_by_id(&self, id: &ObjectId) -> rk_platform::Result<Option<Role>> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_name(&self, name: &str) -> rk_platform::Result<Option<Role>> {
            self.inner.find_by_name(name).await
        }

        async fn find_by_label(&self, label: &str) -> rk_platform::Result<Option<Role>> {
            self.inner.find_by_label(label).await
        }

        async fn count(&self) -> rk_platform::Result<u64> {
            self.inner.count().await
        }

        async fn find_page(&self, offset: u64, limit: u64) -> rk_platform::Result<Vec<Role>> {
            self.inner.find_page(offset, limit).await
        }

        async fn save(&self, role: Role) -> rk_platform::Result<Role> {
            self.inner.save(role).await
        }

        async fn update_info(
            &self,
            id: &ObjectId,
            name: Option<&str>,
            label: Option<&str>,
        ) -> rk_platform::Result<Option<Role>> {
            let queued = self.queued.lock().unwrap().take();
            match queued {
                Some(Membership::Add(parent, sub)) => {
                    self.inner.add_sub_role(&parent, &sub).await?;
                }
                Some(Membership::Remove(parent, sub)) => {
                    self.inner.remove_sub_role(&parent, &sub).await?;
                }
                None => {}
            }
            self.inner.update_info(id, name, label).await
        }

        async fn delete_by_id(&self, id: &ObjectId) -> rk_platform::Result<bool> {
            self.inner.delete_by_id(id).await
        }

        async fn add_sub_role(
            &self,
            parent: &ObjectId,
            sub: &ObjectId,
        ) -> rk_platform::Result<Option<Role>> {
            self.inner.add_sub_role(parent, sub).await
        }

        async fn remove_sub_role(
            &self,
            parent: &ObjectId,
            sub: &ObjectId,
        ) -> rk_platform::Result<Option<Role>> {
            self.inner.remove_sub_role(parent, sub).await
        }

        async fn remove_sub_role_everywhere(&self, sub: &ObjectId) -> rk_platform::Result<u64> {
            self.inner.remove_sub_role_everywhere(sub).await
        }
    }

    fn oid(hex: &str) -> ObjectId {
        ObjectId::parse_str(hex).unwrap()
    }

    #[tokio::test]
    async fn test_label_update_keeps_concurrent_sub_role_add() {
        let repo = Arc::new(InterleavingRepository::default());
        let svc = RoleService::new(repo.clone(), RoleServiceConfig::default());
        let a = svc.create_role("A", "LA").await.unwrap();
        let b = svc.create_role("B", "LB").await.unwrap();

        repo.queue(Membership::Add(oid(&a.role_id), oid(&b.role_id)));
        let updated = svc
            .update_role_informations(&a.role_id, None, Some("LA2"))
            .await
            .unwrap();
        assert_eq!(updated.label, "LA2");
        assert_eq!(updated.sub_roles, vec![b.role_id.clone()]);

        let stored = svc.get_role(&a.role_id).await.unwrap();
        assert_eq!(stored.label, "LA2");
        assert_eq!(stored.sub_roles, vec![b.role_id]);
    }

    #[tokio::test]
    async fn test_name_update_keeps_concurrent_sub_role_removal() {
        let repo = Arc::new(InterleavingRepository::default());
        let svc = RoleService::new(repo.clone(), RoleServiceConfig::default());
        let a = svc.create_role("A", "LA").await.unwrap();
        let b = svc.create_role("B", "LB").await.unwrap();
        svc.add_sub_role_to_role(&a.role_id, &b.role_id).await.unwrap();

        repo.queue(Membership::Remove(oid(&a.role_id), oid(&b.role_id)));
        svc.update_role_informations(&a.role_id, Some("A2"), None)
            .await
            .unwrap();

        let stored = svc.get_role(&a.role_id).await.unwrap();
        assert_eq!(stored.name, "A2");
        assert!(stored.sub_roles.is_empty());
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn test_delete_unknown_role_changes_nothing() {
        let (svc, repo) = service_with(RoleServiceConfig::default());
        svc.create_role("admin", "Administrator").await.unwrap();

        assert_not_found(svc.delete_role(&unknown_id()).await.unwrap_err(), "Could not find role.");
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_returns_role_id() {
        let svc = service();
        let role = svc.create_role("admin", "Administrator").await.unwrap();

        let deleted = svc.delete_role(&role.role_id).await.unwrap();
        assert_eq!(deleted.role_id, role.role_id);
        assert_not_found(svc.get_role(&role.role_id).await.unwrap_err(), "Role not found.");
    }

    #[tokio::test]
    async fn test_cascade_delete_cleans_parents() {
        let (svc, _) = service_with(RoleServiceConfig {
            cascade_delete: true,
            ..Default::default()
        });
        let a = svc.create_role("A", "LA").await.unwrap();
        let b = svc.create_role("B", "LB").await.unwrap();
        svc.add_sub_role_to_role(&a.role_id, &b.role_id).await.unwrap();

        svc.delete_role(&b.role_id).await.unwrap();
        assert!(svc.get_role(&a.role_id).await.unwrap().sub_roles.is_empty());
    }
}

mod sub_roles {
    use super::*;

    #[tokio::test]
    async fn test_add_twice_fails_already_in_role() {
        let svc = service();
        let parent = svc.create_role("A", "LA").await.unwrap();
        let sub = svc.create_role("B", "LB").await.unwrap();

        let updated = svc.add_sub_role_to_role(&parent.role_id, &sub.role_id).await.unwrap();
        assert_eq!(updated.sub_roles, vec![sub.role_id.clone()]);

        assert_bad_request(
            svc.add_sub_role_to_role(&parent.role_id, &sub.role_id).await.unwrap_err(),
            "Role already in role.",
        );
        assert_eq!(svc.get_role(&parent.role_id).await.unwrap().sub_roles.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_absent_fails_not_in_role() {
        let svc = service();
        let parent = svc.create_role("A", "LA").await.unwrap();
        let sub = svc.create_role("B", "LB").await.unwrap();

        assert_bad_request(
            svc.remove_sub_role_from_role(&parent.role_id, &sub.role_id).await.unwrap_err(),
            "Role not in role.",
        );
    }

    #[tokio::test]
    async fn test_add_then_remove_restores_parent() {
        let svc = service();
        let parent = svc.create_role("A", "LA").await.unwrap();
        let existing = svc.create_role("B", "LB").await.unwrap();
        let sub = svc.create_role("C", "LC").await.unwrap();
        svc.add_sub_role_to_role(&parent.role_id, &existing.role_id).await.unwrap();
        let before = svc.get_role(&parent.role_id).await.unwrap().sub_roles;

        svc.add_sub_role_to_role(&parent.role_id, &sub.role_id).await.unwrap();
        svc.remove_sub_role_from_role(&parent.role_id, &sub.role_id).await.unwrap();

        let after = svc.get_role(&parent.role_id).await.unwrap().sub_roles;
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found_without_state_change() {
        let svc = service();
        let parent = svc.create_role("A", "LA").await.unwrap();
        let sub = svc.create_role("B", "LB").await.unwrap();

        assert_not_found(
            svc.add_sub_role_to_role(&unknown_id(), &sub.role_id).await.unwrap_err(),
            "Could not find parent role.",
        );
        assert_not_found(
            svc.add_sub_role_to_role(&parent.role_id, &unknown_id()).await.unwrap_err(),
            "Could not find subRole.",
        );
        assert_not_found(
            svc.remove_sub_role_from_role(&unknown_id(), &sub.role_id).await.unwrap_err(),
            "Could not find parent role.",
        );
        assert_not_found(
            svc.remove_sub_role_from_role(&parent.role_id, &unknown_id()).await.unwrap_err(),
            "Could not find sub role.",
        );

        assert!(svc.get_role(&parent.role_id).await.unwrap().sub_roles.is_empty());
    }

    #[tokio::test]
    async fn test_self_reference_allowed_without_cycle_check() {
        let svc = service();
        let a = svc.create_role("A", "LA").await.unwrap();

        let updated = svc.add_sub_role_to_role(&a.role_id, &a.role_id).await.unwrap();
        assert_eq!(updated.sub_roles, vec![a.role_id.clone()]);
    }

    #[tokio::test]
    async fn test_cycles_rejected_when_enabled() {
        let (svc, _) = service_with(RoleServiceConfig {
            reject_cycles: true,
            ..Default::default()
        });
        let a = svc.create_role("A", "LA").await.unwrap();
        let b = svc.create_role("B", "LB").await.unwrap();
        let c = svc.create_role("C", "LC").await.unwrap();
        svc.add_sub_role_to_role(&a.role_id, &b.role_id).await.unwrap();
        svc.add_sub_role_to_role(&b.role_id, &c.role_id).await.unwrap();

        let cycle = "Adding this sub-role would create a cycle.";
        assert_bad_request(
            svc.add_sub_role_to_role(&c.role_id, &a.role_id).await.unwrap_err(),
            cycle,
        );
        assert_bad_request(
            svc.add_sub_role_to_role(&a.role_id, &a.role_id).await.unwrap_err(),
            cycle,
        );

        // A diamond is not a cycle
        svc.add_sub_role_to_role(&a.role_id, &c.role_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_adds_keep_both_sub_roles() {
        let svc = Arc::new(service());
        let parent = svc.create_role("P", "LP").await.unwrap();
        let mut subs = Vec::new();
        for i in 0..8 {
            subs.push(svc.create_role(&format!("S{i}"), &format!("LS{i}")).await.unwrap());
        }

        let tasks: Vec<_> = subs
            .iter()
            .map(|sub| {
                let svc = svc.clone();
                let parent_id = parent.role_id.clone();
                let sub_id = sub.role_id.clone();
                tokio::spawn(async move { svc.add_sub_role_to_role(&parent_id, &sub_id).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = svc.get_role(&parent.role_id).await.unwrap();
        assert_eq!(stored.sub_roles.len(), subs.len());
    }
}

#[tokio::test]
async fn test_dangling_reference_survives_delete() {
    let svc = service();
    let a = svc.create_role("A", "LA").await.unwrap();
    let b = svc.create_role("B", "LB").await.unwrap();

    let updated = svc.add_sub_role_to_role(&a.role_id, &b.role_id).await.unwrap();
    assert_eq!(updated.sub_roles, vec![b.role_id.clone()]);
    assert_eq!(svc.get_role(&a.role_id).await.unwrap().sub_roles, vec![b.role_id.clone()]);

    svc.delete_role(&b.role_id).await.unwrap();
    assert_eq!(svc.get_role(&a.role_id).await.unwrap().sub_roles, vec![b.role_id.clone()]);
}
