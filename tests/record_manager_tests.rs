use recordmgr::{
    EntityRegistry, EntityState, InMemoryContext, ManagerConfig, ManagerError, Order,
    PersistenceContext, Record, RecordManager, SharedContext, Value,
};
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::Mutex;

fn registry() -> EntityRegistry {
    EntityRegistry::new()
        .with("Article", |r| {
            r.set("title", "");
            r.set("slug", "");
            r.set("state", false);
        })
        .with("Comment", |r| {
            r.set("body", "");
            r.set("email", "");
            r.set("state", 0);
        })
        .with("Tag", |r| {
            r.set("label", "");
        })
}

fn memory() -> Arc<Mutex<InMemoryContext>> {
    Arc::new(Mutex::new(
        InMemoryContext::new()
            .with_entity("Blog:Article", ["title", "slug", "state"])
            .with_entity("Blog:Comment", ["body", "email", "state"])
            .with_entity("Blog:Tag", ["label"]),
    ))
}

async fn manager_for(ctx: SharedContext, entity: &str) -> RecordManager {
    let config = ManagerConfig::new("Blog", "Acme::BlogBundle")
        .entity(entity)
        .class_name("BlogManager");
    RecordManager::from_config(ctx, registry(), config)
        .await
        .unwrap()
}

async fn flushes(memory: &Arc<Mutex<InMemoryContext>>) -> usize {
    memory.lock().await.flush_count()
}

async fn seed_articles(manager: &RecordManager, count: usize) {
    for i in 1..=count {
        let mut article = manager.create_new(None).unwrap();
        article.set("title", format!("Article {}", i));
        manager.persist(article).await.unwrap();
    }
    manager.commit().await.unwrap();
}

// ============================================================================
// Entity references
// ============================================================================

#[tokio::test]
async fn test_set_entity_binds_name_and_repository() {
    let memory = memory();
    let manager = manager_for(memory.clone(), "Blog:Article").await;

    assert_eq!(manager.entity_name(), Some("Article"));
    assert_eq!(manager.repository().unwrap().entity_ref(), "Blog:Article");
}

#[tokio::test]
async fn test_bundle_prefix_matches_case_insensitively() {
    let manager = manager_for(memory(), "blog:Article").await;
    assert_eq!(manager.entity_name(), Some("Article"));

    let manager = manager_for(memory(), "BLOG:Comment").await;
    assert_eq!(manager.entity_name(), Some("Comment"));
    assert_eq!(manager.repository().unwrap().entity_ref(), "Blog:Comment");
}

#[tokio::test]
async fn test_non_matching_reference_is_ignored() {
    let mut manager = manager_for(memory(), "Blog:Article").await;

    for reference in ["Shop:Order", "Blog:", "Blog:Article2", "Blog:Art icle", "Article"] {
        manager.set_entity(reference).await.unwrap();
        assert_eq!(manager.entity_name(), Some("Article"));
        assert_eq!(manager.repository().unwrap().entity_ref(), "Blog:Article");
    }
}

#[tokio::test]
async fn test_strict_references_reject_foreign_bundle() {
    let config = ManagerConfig::new("Blog", "Acme::BlogBundle")
        .entity("Blog:Article")
        .strict_entity_refs(true);
    let mut manager = RecordManager::from_config(memory(), registry(), config)
        .await
        .unwrap();

    let err = manager.set_entity("Shop:Order").await.unwrap_err();
    assert_eq!(
        err,
        ManagerError::InvalidEntityReference("Shop:Order".to_string())
    );
    assert_eq!(manager.entity_name(), Some("Article"));
}

#[tokio::test]
async fn test_decode_into_undeclared_property_fails() {
    let mut manager = manager_for(memory(), "Blog:Article").await;

    let err = manager
        .decode_entity_name("Blog:Tag", Some("tagName"), None)
        .await
        .unwrap_err();
    assert_eq!(err, ManagerError::no_such_property("tagName", "BlogManager"));

    manager.declare_property("tagName");
    manager
        .decode_entity_name("Blog:Tag", Some("tagName"), None)
        .await
        .unwrap();
    assert_eq!(manager.properties().entity_name("tagName"), Some("Tag"));
}

#[tokio::test]
async fn test_entity_before_bundle_is_a_configuration_error() {
    let mut manager = RecordManager::new("BlogManager");
    manager.set_persistence_context(memory());
    let err = manager.set_entity("Blog:Article").await.unwrap_err();
    assert!(matches!(err, ManagerError::Config(_)));
}

// ============================================================================
// CRUD
// ============================================================================

#[tokio::test]
async fn test_save_commits_once_and_persist_never() {
    let memory = memory();
    let manager = manager_for(memory.clone(), "Blog:Article").await;

    let article = manager.create_new(None).unwrap().with("title", "Hello");
    let article = manager.save(article).await.unwrap();
    assert_eq!(flushes(&memory).await, 1);
    assert_eq!(article.id(), Some(&Value::Integer(1)));

    let draft = manager.create_new(None).unwrap().with("title", "Draft");
    let draft = manager.persist(draft).await.unwrap();
    assert_eq!(flushes(&memory).await, 1);
    assert_eq!(memory.lock().await.stored_count("Blog:Article"), 1);
    assert!(!manager.is_new(&draft).await.unwrap());

    manager.commit().await.unwrap();
    assert_eq!(flushes(&memory).await, 2);
    assert_eq!(memory.lock().await.stored_count("Blog:Article"), 2);
}

#[tokio::test]
async fn test_delete_and_remove() {
    let memory = memory();
    let manager = manager_for(memory.clone(), "Blog:Article").await;
    seed_articles(&manager, 2).await;

    let first = manager.find(1, None).await.unwrap().unwrap();
    assert_eq!(manager.delete(&first).await.unwrap(), 1);
    assert!(manager.find(1, None).await.unwrap().is_none());

    let second = manager.find(2, None).await.unwrap().unwrap();
    manager.remove(&second).await.unwrap();
    assert_eq!(
        memory.lock().await.entity_state(&second),
        EntityState::Removed
    );
    assert_eq!(manager.find_all().await.unwrap().len(), 1);

    manager.commit().await.unwrap();
    assert!(manager.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_new() {
    let manager = manager_for(memory(), "Blog:Article").await;

    let article = manager.create_new(None).unwrap();
    assert_eq!(article.class(), "Acme::BlogBundle::Entity::Article");
    assert_eq!(article.entity_ref(), "Blog:Article");
    assert!(article.id().is_none());
    assert!(manager.is_new(&article).await.unwrap());

    let tag = manager.create_new(Some("Tag")).unwrap();
    assert_eq!(tag.class(), "Acme::BlogBundle::Entity::Tag");

    let err = manager.create_new(Some("Ghost")).unwrap_err();
    assert_eq!(
        err,
        ManagerError::Construction("Acme::BlogBundle::Entity::Ghost".to_string())
    );
}

#[tokio::test]
async fn test_find_through_named_repository() {
    let memory = memory();
    let mut manager = manager_for(memory.clone(), "Blog:Article").await;

    let comment = manager
        .create_new(Some("Comment"))
        .unwrap()
        .with("body", "First!");
    {
        let mut ctx = memory.lock().await;
        let mut comment = comment;
        ctx.persist(&mut comment).await.unwrap();
        ctx.flush().await.unwrap();
    }

    let err = manager.find(1, Some("Comment")).await.unwrap_err();
    assert_eq!(
        err,
        ManagerError::no_such_property("commentRepository", "BlogManager")
    );

    manager.declare_property("commentRepository");
    let err = manager.find(1, Some("Comment")).await.unwrap_err();
    assert_eq!(
        err,
        ManagerError::no_such_property("commentRepository", "BlogManager")
    );

    manager
        .decode_entity_name("Blog:Comment", None, Some("commentRepository"))
        .await
        .unwrap();

    let found = manager.find(1, Some("Comment")).await.unwrap().unwrap();
    assert_eq!(found.get("body"), Some(&Value::from("First!")));
    assert!(manager.find(1, None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_by_field() {
    let memory = memory();
    let manager = manager_for(memory, "Blog:Comment").await;

    for email in ["x@example.com", "y@example.com", "y@example.com"] {
        let comment = manager.create_new(None).unwrap().with("email", email);
        manager.save(comment).await.unwrap();
    }

    let found = manager
        .get_by_field([("email", "x@example.com")])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id(), Some(&Value::Integer(1)));

    assert!(
        manager
            .get_by_field([("email", "z@example.com")])
            .await
            .unwrap()
            .is_none()
    );

    let all = manager
        .get_all_by_field([("email", "y@example.com")])
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let err = manager.get_by_field([("nickname", "x")]).await.unwrap_err();
    assert!(matches!(err, ManagerError::Query(_)));
}

#[tokio::test]
async fn test_get_single_scalar_field() {
    let manager = manager_for(memory(), "Blog:Article").await;
    seed_articles(&manager, 3).await;

    let title = manager.get_single_scalar_field(2, "title").await.unwrap();
    assert_eq!(title, Value::from("Article 2"));

    let err = manager.get_single_scalar_field(42, "title").await.unwrap_err();
    assert_eq!(err, ManagerError::NoResult);

    let err = manager.get_single_scalar_field(1, "missing").await.unwrap_err();
    assert!(matches!(err, ManagerError::Query(_)));
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_find_all_paginated() {
    let manager = manager_for(memory(), "Blog:Article").await;
    seed_articles(&manager, 12).await;

    let mut pager = manager.find_all_paginated(2, 5).await.unwrap();
    assert_eq!(pager.nb_pages().await.unwrap(), 3);
    assert_eq!(pager.nb_results().await.unwrap(), 12);

    let ids: Vec<i64> = pager
        .current_page_results()
        .await
        .unwrap()
        .iter()
        .filter_map(|r| r.id().and_then(Value::as_i64))
        .collect();
    assert_eq!(ids, [6, 7, 8, 9, 10]);

    assert!(manager.find_all_paginated(4, 5).await.is_err());
    assert!(manager.find_all_paginated(0, 5).await.is_err());
}

#[tokio::test]
async fn test_pager_falls_back_to_default_page_size() {
    let config = ManagerConfig::new("Blog", "Acme::BlogBundle")
        .entity("Blog:Article")
        .default_page_size(4);
    let manager = RecordManager::from_config(memory(), registry(), config)
        .await
        .unwrap();
    seed_articles(&manager, 6).await;

    let qb = manager
        .repository()
        .unwrap()
        .create_query_builder("e")
        .order_by("e.id", Order::Desc);

    let mut pager = manager
        .get_pager_from_query_builder(qb.clone(), None)
        .unwrap();
    assert_eq!(pager.max_per_page(), 4);
    assert_eq!(pager.nb_pages().await.unwrap(), 2);
    let first = pager.current_page_results().await.unwrap();
    assert_eq!(first[0].id(), Some(&Value::Integer(6)));

    let pager = manager.get_pager_from_query_builder(qb.clone(), Some(0)).unwrap();
    assert_eq!(pager.max_per_page(), 4);

    let pager = manager.get_pager_from_query_builder(qb, Some(3)).unwrap();
    assert_eq!(pager.max_per_page(), 3);
}

// ============================================================================
// State helpers
// ============================================================================

#[tokio::test]
async fn test_toggle_state_round_trip() {
    let memory = memory();
    let manager = manager_for(memory.clone(), "Blog:Article").await;

    let mut article = manager.create_new(None).unwrap().with("state", true);
    assert!(!manager.toggle_state(&mut article).await.unwrap());
    assert_eq!(flushes(&memory).await, 1);

    let stored = manager.find(1, None).await.unwrap().unwrap();
    assert_eq!(stored.state().unwrap(), &Value::Boolean(false));

    assert!(manager.toggle_state(&mut article).await.unwrap());
    assert_eq!(article.state().unwrap(), &Value::Boolean(true));
    assert_eq!(flushes(&memory).await, 2);
}

#[tokio::test]
async fn test_toggle_state_requires_state_accessor() {
    let memory = memory();
    let manager = manager_for(memory.clone(), "Blog:Article").await;

    let mut tag = manager.create_new(Some("Tag")).unwrap();
    let err = manager.toggle_state(&mut tag).await.unwrap_err();
    assert_eq!(
        err,
        ManagerError::no_such_property("getState", "Acme::BlogBundle::Entity::Tag")
    );
    assert_eq!(flushes(&memory).await, 0);
}

#[tokio::test]
async fn test_switch_state() {
    let memory = memory();
    let manager = manager_for(memory.clone(), "Blog:Comment").await;

    let comment = manager.create_new(None).unwrap();
    assert_eq!(manager.switch_state(comment).await.unwrap(), 1);

    let stored = manager.find(1, None).await.unwrap().unwrap();
    assert_eq!(stored.state().unwrap(), &Value::Integer(1));

    assert_eq!(manager.switch_state(1).await.unwrap(), 0);
    assert_eq!(manager.switch_state("1").await.unwrap(), 1);
}

#[tokio::test]
async fn test_switch_state_only_treats_integer_one_as_on() {
    let manager = manager_for(memory(), "Blog:Comment").await;

    let comment = manager.create_new(None).unwrap().with("state", true);
    assert_eq!(manager.switch_state(comment).await.unwrap(), 1);
}

#[tokio::test]
async fn test_switch_state_rejects_other_types_without_saving() {
    let memory = memory();
    let manager = manager_for(memory.clone(), "Blog:Comment").await;

    let article = manager.create_new(Some("Article")).unwrap();
    let err = manager.switch_state(article).await.unwrap_err();
    assert_eq!(
        err,
        ManagerError::TypeMismatch("Entity is not an instance of Comment".to_string())
    );

    let err = manager.switch_state(99).await.unwrap_err();
    assert!(matches!(err, ManagerError::TypeMismatch(_)));
    assert_eq!(flushes(&memory).await, 0);
}

#[tokio::test]
async fn test_check_instance_compares_the_full_class() {
    let manager = manager_for(memory(), "Blog:Article").await;

    let article = manager.create_new(None).unwrap();
    let comment = manager.create_new(Some("Comment")).unwrap();
    let foreign = Record::new("Shop:Article", "Acme::ShopBundle::Entity::Article");

    assert!(manager.check_instance(&article));
    // Same bundle, different entity.
    assert!(!manager.check_instance(&comment));
    assert!(!manager.check_instance(&foreign));
}

#[tokio::test]
async fn test_is_new() {
    let manager = manager_for(memory(), "Blog:Article").await;

    let article = manager.create_new(None).unwrap();
    assert!(manager.is_new(&article).await.unwrap());

    let article = manager.save(article).await.unwrap();
    assert!(!manager.is_new(&article).await.unwrap());

    let loaded = manager.find(1, None).await.unwrap().unwrap();
    assert!(!manager.is_new(&loaded).await.unwrap());
}

#[tokio::test]
async fn test_operations_without_context_fail() {
    let manager = RecordManager::new("BlogManager");
    let record = Record::new("Blog:Article", "Acme::BlogBundle::Entity::Article");

    assert!(matches!(
        manager.save(record.clone()).await,
        Err(ManagerError::Config(_))
    ));
    assert!(matches!(manager.commit().await, Err(ManagerError::Config(_))));
    assert_eq!(
        manager.find_all().await.unwrap_err(),
        ManagerError::no_such_property("repository", "BlogManager")
    );
}

// ============================================================================
// Concrete managers
// ============================================================================

struct ArticleManager {
    base: RecordManager,
}

impl Deref for ArticleManager {
    type Target = RecordManager;

    fn deref(&self) -> &RecordManager {
        &self.base
    }
}

impl ArticleManager {
    async fn publish(&self, title: &str) -> recordmgr::Result<Record> {
        let article = self
            .create_new(None)?
            .with("title", title)
            .with("slug", self.slug(title))
            .with("state", true);
        self.save(article).await
    }

    async fn find_by_slug(&self, slug: &str) -> recordmgr::Result<Option<Record>> {
        self.get_by_field([("slug", slug)]).await
    }
}

#[tokio::test]
async fn test_concrete_manager_builds_on_the_base() {
    let base = manager_for(memory(), "Blog:Article").await;
    let articles = ArticleManager { base };

    let published = articles.publish("  Hello_World!! 2024 ").await.unwrap();
    assert_eq!(published.get("slug"), Some(&Value::from("hello-world-2024")));

    let found = articles
        .find_by_slug("hello-world-2024")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id(), published.id());
    assert_eq!(articles.slug("a---b"), "a-b");
}
