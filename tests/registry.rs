use async_trait::async_trait;
use school_academics::model::{
    AcademicYear, ActorUpdate, Admin, ClassLevel, ClassLevelUpdate, NewAcademicYear, NewActor, NewClassLevel,
    NewProgram, NewSubject, Program, Subject, SubjectUpdate, Teacher,
};
use school_academics::service::directory::register_first_admin;
use school_academics::store::{collections, DocumentStore, Filter, MemoryDocumentStore, PushOutcome};
use school_academics::{Actor, AppError, Registry, Role};
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use uuid::Uuid;

fn store() -> MemoryDocumentStore {
    MemoryDocumentStore::new(&collections())
}

async fn admin(store: &dyn DocumentStore) -> Actor {
    let admin = register_first_admin(
        store,
        NewActor {
            name: "Head Admin".into(),
            email: "head@school.test".into(),
        },
    )
    .await
    .unwrap();
    Actor::new(admin.id, Role::Admin)
}

fn class_level(name: &str) -> NewClassLevel {
    NewClassLevel {
        name: name.into(),
        description: "lower secondary".into(),
        duration: None,
    }
}

#[tokio::test]
async fn create_links_class_level_to_its_admin_once() {
    let s = store();
    let actor = admin(&s).await;

    let level = Registry::<ClassLevel>::new(&s)
        .create(class_level("JSS 1"), &actor)
        .await
        .unwrap();
    assert_eq!(level.name, "JSS 1");
    assert_eq!(level.created_by, actor.id);

    let owner = Registry::<Admin>::new(&s).get(actor.id).await.unwrap();
    assert_eq!(owner.class_levels, vec![level.id]);
}

#[tokio::test]
async fn duplicate_name_is_a_conflict_and_writes_nothing() {
    let s = store();
    let actor = admin(&s).await;
    let registry = Registry::<ClassLevel>::new(&s);
    registry.create(class_level("JSS 1"), &actor).await.unwrap();

    let err = registry.create(class_level("JSS 1"), &actor).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(s.count("class_levels").await.unwrap(), 1);
    let owner = Registry::<Admin>::new(&s).get(actor.id).await.unwrap();
    assert_eq!(owner.class_levels.len(), 1);
}

#[tokio::test]
async fn concurrent_creates_with_same_name_succeed_once() {
    let s = store();
    let actor = admin(&s).await;
    let registry = Registry::<ClassLevel>::new(&s);

    let (a, b) = tokio::join!(
        registry.create(class_level("JSS 2"), &actor),
        registry.create(class_level("JSS 2"), &actor)
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert_eq!(s.count("class_levels").await.unwrap(), 1);
    let owner = Registry::<Admin>::new(&s).get(actor.id).await.unwrap();
    assert_eq!(owner.class_levels.len(), 1);
}

#[tokio::test]
async fn unknown_actor_cannot_create() {
    let s = store();
    admin(&s).await;
    let ghost = Actor::new(Uuid::new_v4(), Role::Admin);

    let err = Registry::<ClassLevel>::new(&s)
        .create(class_level("JSS 3"), &ghost)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(s.count("class_levels").await.unwrap(), 0);
}

#[tokio::test]
async fn invalid_payload_is_rejected_before_storage() {
    let s = store();
    let actor = admin(&s).await;

    let err = Registry::<ClassLevel>::new(&s)
        .create(class_level("   "), &actor)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(s.count("class_levels").await.unwrap(), 0);
}

#[tokio::test]
async fn read_missing_is_not_found() {
    let s = store();
    let err = Registry::<ClassLevel>::new(&s).get(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn list_keeps_insertion_order() {
    let s = store();
    let actor = admin(&s).await;
    let registry = Registry::<ClassLevel>::new(&s);
    for name in ["JSS 1", "JSS 2", "JSS 3"] {
        registry.create(class_level(name), &actor).await.unwrap();
    }
    let names: Vec<String> = registry.list().await.unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["JSS 1", "JSS 2", "JSS 3"]);
}

#[tokio::test]
async fn update_keeping_own_name_succeeds() {
    let s = store();
    let actor = admin(&s).await;
    let registry = Registry::<ClassLevel>::new(&s);
    let level = registry.create(class_level("JSS 1"), &actor).await.unwrap();

    let updated = registry
        .update(
            level.id,
            ClassLevelUpdate {
                name: Some("JSS 1".into()),
                description: Some("first year".into()),
                ..Default::default()
            },
            &actor,
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "JSS 1");
    assert_eq!(updated.description, "first year");
    assert!(updated.updated_at >= level.updated_at);
}

#[tokio::test]
async fn update_to_another_records_name_is_a_conflict() {
    let s = store();
    let actor = admin(&s).await;
    let registry = Registry::<ClassLevel>::new(&s);
    registry.create(class_level("JSS 1"), &actor).await.unwrap();
    let second = registry.create(class_level("JSS 2"), &actor).await.unwrap();

    let err = registry
        .update(
            second.id,
            ClassLevelUpdate {
                name: Some("JSS 1".into()),
                ..Default::default()
            },
            &actor,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(registry.get(second.id).await.unwrap().name, "JSS 2");
}

#[tokio::test]
async fn update_restamps_created_by() {
    let s = store();
    let first = admin(&s).await;
    let second = Registry::<Admin>::new(&s)
        .create(
            NewActor {
                name: "Deputy".into(),
                email: "deputy@school.test".into(),
            },
            &first,
        )
        .await
        .unwrap();
    let second = Actor::new(second.id, Role::Admin);
    let registry = Registry::<ClassLevel>::new(&s);
    let level = registry.create(class_level("JSS 1"), &first).await.unwrap();

    let updated = registry
        .update(
            level.id,
            ClassLevelUpdate {
                duration: Some("1 year".into()),
                ..Default::default()
            },
            &second,
        )
        .await
        .unwrap();
    assert_eq!(updated.created_by, second.id);
    assert_eq!(updated.duration.as_deref(), Some("1 year"));
}

#[tokio::test]
async fn update_missing_is_not_found() {
    let s = store();
    let actor = admin(&s).await;
    let err = Registry::<ClassLevel>::new(&s)
        .update(Uuid::new_v4(), ClassLevelUpdate::default(), &actor)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn delete_is_idempotent_and_leaves_owner_reference() {
    let s = store();
    let actor = admin(&s).await;
    let registry = Registry::<ClassLevel>::new(&s);
    let level = registry.create(class_level("JSS 1"), &actor).await.unwrap();

    registry.delete(level.id).await.unwrap();
    registry.delete(level.id).await.unwrap();
    assert!(matches!(registry.get(level.id).await.unwrap_err(), AppError::NotFound(_)));

    let owner = Registry::<Admin>::new(&s).get(actor.id).await.unwrap();
    assert_eq!(owner.class_levels, vec![level.id]);
}

#[tokio::test]
async fn academic_year_rejects_inverted_span() {
    let s = store();
    let actor = admin(&s).await;
    let err = Registry::<AcademicYear>::new(&s)
        .create(
            NewAcademicYear {
                name: "2025/2026".into(),
                from_year: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
                to_year: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
                is_current: false,
            },
            &actor,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(s.count("academic_years").await.unwrap(), 0);
}

#[tokio::test]
async fn subject_is_added_to_program_once() {
    let s = store();
    let actor = admin(&s).await;
    let program = Registry::<Program>::new(&s)
        .create(
            NewProgram {
                name: "Computer Science".into(),
                description: "BSc".into(),
                duration: "4 years".into(),
            },
            &actor,
        )
        .await
        .unwrap();
    assert!(program.code.starts_with("CS"));
    let subject = Registry::<Subject>::new(&s)
        .create(
            NewSubject {
                name: "Algorithms".into(),
                description: String::new(),
                teacher: None,
                academic_term: None,
                duration: "3 months".into(),
            },
            &actor,
        )
        .await
        .unwrap();

    let key = [("name".to_string(), Value::String("Algorithms".into()))];
    let programs = Registry::<Program>::new(&s);
    let linked = programs.add_reference::<Subject>(program.id, "subjects", &key).await.unwrap();
    assert_eq!(linked.subjects, vec![subject.id]);

    let err = programs
        .add_reference::<Subject>(program.id, "subjects", &key)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(programs.get(program.id).await.unwrap().subjects.len(), 1);
}

#[tokio::test]
async fn adding_unknown_subject_is_not_found() {
    let s = store();
    let actor = admin(&s).await;
    let program = Registry::<Program>::new(&s)
        .create(
            NewProgram {
                name: "Fine Arts".into(),
                description: String::new(),
                duration: "4 years".into(),
            },
            &actor,
        )
        .await
        .unwrap();

    let key = [("name".to_string(), Value::String("Pottery".into()))];
    let err = Registry::<Program>::new(&s)
        .add_reference::<Subject>(program.id, "subjects", &key)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn second_bootstrap_admin_is_forbidden() {
    let s = store();
    admin(&s).await;
    let err = register_first_admin(
        &s,
        NewActor {
            name: "Intruder".into(),
            email: "intruder@school.test".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(s.count("admins").await.unwrap(), 1);
}

#[tokio::test]
async fn actor_emails_are_unique_per_collection() {
    let s = store();
    let actor = admin(&s).await;
    let teachers = Registry::<Teacher>::new(&s);
    let req = || NewActor {
        name: "Kofi".into(),
        email: "kofi@school.test".into(),
    };
    teachers.create(req(), &actor).await.unwrap();
    let err = teachers.create(req(), &actor).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn padded_rename_onto_existing_name_is_a_conflict() {
    let s = store();
    let actor = admin(&s).await;
    let registry = Registry::<ClassLevel>::new(&s);
    registry.create(class_level("Niveau 100"), &actor).await.unwrap();
    let other = registry.create(class_level("Niveau 200"), &actor).await.unwrap();

    let err = registry
        .update(
            other.id,
            ClassLevelUpdate {
                name: Some("Niveau 100 ".into()),
                ..Default::default()
            },
            &actor,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let renamed = registry
        .update(
            other.id,
            ClassLevelUpdate {
                name: Some("  Niveau 300 ".into()),
                ..Default::default()
            },
            &actor,
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Niveau 300");
}

#[tokio::test]
async fn renamed_subject_is_still_found_by_trimmed_name() {
    let s = store();
    let actor = admin(&s).await;
    let program = Registry::<Program>::new(&s)
        .create(
            NewProgram {
                name: "Natural Sciences".into(),
                description: String::new(),
                duration: "4 years".into(),
            },
            &actor,
        )
        .await
        .unwrap();
    let subjects = Registry::<Subject>::new(&s);
    let subject = subjects
        .create(
            NewSubject {
                name: "Chemistry".into(),
                description: String::new(),
                teacher: None,
                academic_term: None,
                duration: "3 months".into(),
            },
            &actor,
        )
        .await
        .unwrap();
    subjects
        .update(
            subject.id,
            SubjectUpdate {
                name: Some(" Physics ".into()),
                ..Default::default()
            },
            &actor,
        )
        .await
        .unwrap();

    let key = [("name".to_string(), Value::String("Physics".into()))];
    let linked = Registry::<Program>::new(&s)
        .add_reference::<Subject>(program.id, "subjects", &key)
        .await
        .unwrap();
    assert_eq!(linked.subjects, vec![subject.id]);
}

#[tokio::test]
async fn email_update_is_lower_cased_and_stays_unique() {
    let s = store();
    let actor = admin(&s).await;
    let teachers = Registry::<Teacher>::new(&s);
    teachers
        .create(
            NewActor {
                name: "Kofi".into(),
                email: "kofi@school.test".into(),
            },
            &actor,
        )
        .await
        .unwrap();
    let esi = teachers
        .create(
            NewActor {
                name: "Esi".into(),
                email: "esi@school.test".into(),
            },
            &actor,
        )
        .await
        .unwrap();

    let err = teachers
        .update(
            esi.id,
            ActorUpdate {
                email: Some("KOFI@School.Test".into()),
                ..Default::default()
            },
            &actor,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let updated = teachers
        .update(
            esi.id,
            ActorUpdate {
                email: Some(" Esi.Mensah@School.Test ".into()),
                ..Default::default()
            },
            &actor,
        )
        .await
        .unwrap();
    assert_eq!(updated.email, "esi.mensah@school.test");
}

#[tokio::test]
async fn students_cannot_share_a_student_number() {
    let s = store();
    let a = Uuid::new_v4();
    s.insert("students", a, json!({"id": a, "email": "a@school.test", "studentId": "STU12345678"}))
        .await
        .unwrap();
    let b = Uuid::new_v4();
    let err = s
        .insert("students", b, json!({"id": b, "email": "b@school.test", "studentId": "STU12345678"}))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(s.count("students").await.unwrap(), 1);
}

/// Memory store whose reference pushes fail with a fixed outcome.
struct BrokenLinks {
    inner: MemoryDocumentStore,
    fail_with_error: bool,
}

#[async_trait]
impl DocumentStore for BrokenLinks {
    async fn ping(&self) -> Result<(), AppError> {
        self.inner.ping().await
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, AppError> {
        self.inner.find_by_id(collection, id).await
    }

    async fn find_by_ids(&self, collection: &str, ids: &[Uuid]) -> Result<Vec<Value>, AppError> {
        self.inner.find_by_ids(collection, ids).await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, AppError> {
        self.inner.find(collection, filter).await
    }

    async fn count(&self, collection: &str) -> Result<u64, AppError> {
        self.inner.count(collection).await
    }

    async fn insert(&self, collection: &str, id: Uuid, doc: Value) -> Result<Value, AppError> {
        self.inner.insert(collection, id, doc).await
    }

    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        changes: Map<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        self.inner.update(collection, id, changes).await
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, AppError> {
        self.inner.delete(collection, id).await
    }

    async fn push_reference(
        &self,
        _collection: &str,
        _id: Uuid,
        _field: &str,
        _target: Uuid,
    ) -> Result<PushOutcome, AppError> {
        if self.fail_with_error {
            Err(AppError::BadRequest("write refused".into()))
        } else {
            Ok(PushOutcome::Missing)
        }
    }
}

async fn assert_orphan_is_reported(fail_with_error: bool) {
    let s = BrokenLinks {
        inner: store(),
        fail_with_error,
    };
    let actor = admin(&s).await;

    let err = Registry::<ClassLevel>::new(&s)
        .create(class_level("JSS 1"), &actor)
        .await
        .unwrap_err();
    let resource_id = match err {
        AppError::OwnerLink {
            collection,
            resource_id,
            owner,
            ..
        } => {
            assert_eq!(collection, "class_levels");
            assert_eq!(owner, "admins");
            resource_id
        }
        other => panic!("expected OwnerLink, got {:?}", other),
    };

    let orphan = Registry::<ClassLevel>::new(&s).get(resource_id).await.unwrap();
    assert_eq!(orphan.name, "JSS 1");
    let owner = Registry::<Admin>::new(&s).get(actor.id).await.unwrap();
    assert!(!owner.class_levels.contains(&resource_id));
}

#[tokio::test]
async fn failed_owner_link_reports_the_orphaned_resource() {
    assert_orphan_is_reported(true).await;
}

#[tokio::test]
async fn vanished_owner_reports_the_orphaned_resource() {
    assert_orphan_is_reported(false).await;
}
