//! Database round trips
//!
//! Run with: DATABASE_URL=postgres://... cargo test -p hearth-server -- --ignored

use hearth_core::{parse_records, BulkKind, PoStatus, Template, UserRecord};
use hearth_server::db::{
    self, DbError, DynamicDataRepo, EntityFilter, EntityRepo, MetadataRepo, NewEntity,
    NewPurchaseOrder, NewRelationship, OrganizationRepo, PurchaseOrderFilter, RelationshipRepo,
    TransactionRepo,
};
use hearth_server::models::{
    EntityCode, EntityName, EntityType, FieldName, FieldValue, MetadataKey, OrderLineInput,
    OrderLines, OrganizationName, Pagination, RelationshipType,
};
use hearth_server::services::inputs::user_from_record;
use hearth_server::services::{bulk_upload, TemplateDeployer};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let pool = db::create_pool(&url).await.unwrap();
    db::migrations::run(&pool).await.unwrap();
    pool
}

async fn organization(pool: &PgPool, name: &str) -> Uuid {
    OrganizationRepo::new(pool)
        .create(
            &OrganizationName::new(name).unwrap(),
            "restaurant",
            None,
            &json!({}),
        )
        .await
        .unwrap()
        .id
}

fn menu_item(name: &str, code: Option<&str>) -> NewEntity {
    NewEntity {
        entity_type: EntityType::new("menu_item").unwrap(),
        name: EntityName::new(name).unwrap(),
        code: EntityCode::optional(code).unwrap(),
        status: None,
        fields: vec![(
            FieldName::new("price_cents").unwrap(),
            FieldValue::Number(450.0),
        )],
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn organization_code_and_soft_delete() {
    let pool = pool().await;
    let repo = OrganizationRepo::new(&pool);

    let org = repo
        .create(
            &OrganizationName::new("Mario's Pizza").unwrap(),
            "restaurant",
            Some("food"),
            &json!({ "currency": "EUR" }),
        )
        .await
        .unwrap();
    assert!(org.organization_code.starts_with("MARIOSPI-"));

    repo.deactivate(org.id).await.unwrap();
    assert!(matches!(repo.get(org.id).await, Err(DbError::NotFound { .. })));
}

#[tokio::test]
#[ignore = "requires database"]
async fn entity_with_fields_and_duplicate_code() {
    let pool = pool().await;
    let org = organization(&pool, "Entity Test").await;
    let repo = EntityRepo::new(&pool);

    let created = repo.create(org, &menu_item("Latte", Some("lat"))).await.unwrap();
    assert_eq!(created.entity.entity_code.as_deref(), Some("LAT"));
    assert_eq!(created.fields.len(), 1);

    let dup = repo.create(org, &menu_item("Other Latte", Some("LAT"))).await;
    assert!(matches!(dup, Err(DbError::Conflict(_))));

    let filter = EntityFilter {
        entity_type: Some(EntityType::new("menu_item").unwrap()),
        search: Some("lat".into()),
    };
    let page = repo.list(org, &filter, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].fields[0].value, FieldValue::Number(450.0));

    let counts = repo.count_by_type(org).await.unwrap();
    assert_eq!(counts, vec![("menu_item".to_string(), 1)]);
}

#[tokio::test]
#[ignore = "requires database"]
async fn reads_are_scoped_by_organization() {
    let pool = pool().await;
    let a = organization(&pool, "Scope A").await;
    let b = organization(&pool, "Scope B").await;

    let entity = EntityRepo::new(&pool)
        .create(a, &menu_item("Scoped", None))
        .await
        .unwrap();

    let other = EntityRepo::new(&pool).get(b, entity.entity.id).await;
    assert!(matches!(other, Err(DbError::NotFound { .. })));

    let field = DynamicDataRepo::new(&pool)
        .upsert(
            b,
            entity.entity.id,
            &FieldName::new("vegan").unwrap(),
            &FieldValue::Boolean(true),
        )
        .await;
    assert!(matches!(field, Err(DbError::NotFound { .. })));
}

#[tokio::test]
#[ignore = "requires database"]
async fn relationships_and_metadata() {
    let pool = pool().await;
    let org = organization(&pool, "Links").await;
    let entities = EntityRepo::new(&pool);
    let burger = entities.create(org, &menu_item("Burger", None)).await.unwrap();
    let bun = entities.create(org, &menu_item("Bun", None)).await.unwrap();

    let new = NewRelationship {
        source_entity_id: burger.entity.id,
        target_entity_id: bun.entity.id,
        relationship_type: RelationshipType::new("uses_ingredient").unwrap(),
        metadata: json!({ "quantity": 1 }),
    };
    let repo = RelationshipRepo::new(&pool);
    let first = repo.create(org, &new).await.unwrap();
    let again = repo.create(org, &new).await.unwrap();
    assert_eq!(first.id, again.id);

    assert_eq!(repo.list_for_entity(org, bun.entity.id).await.unwrap().len(), 1);

    let meta = MetadataRepo::new(&pool);
    let key = MetadataKey::new("pos_sync").unwrap();
    meta.put(org, burger.entity.id, &key, &json!({ "id": 17 })).await.unwrap();
    meta.put(org, burger.entity.id, &key, &json!({ "id": 18 })).await.unwrap();
    let entry = meta.get(org, burger.entity.id, &key).await.unwrap();
    assert_eq!(entry.metadata_value, json!({ "id": 18 }));

    entities.deactivate(org, bun.entity.id).await.unwrap();
    assert!(repo.list_for_entity(org, burger.entity.id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires database"]
async fn purchase_order_lifecycle() {
    let pool = pool().await;
    let org = organization(&pool, "Purchasing").await;

    let lines = OrderLines::new(vec![
        OrderLineInput {
            entity_id: None,
            description: "Flour".into(),
            quantity: 2.5,
            unit_price_cents: 199,
        },
        OrderLineInput {
            entity_id: None,
            description: "Yeast".into(),
            quantity: 1.0,
            unit_price_cents: 350,
        },
    ])
    .unwrap();

    let repo = TransactionRepo::new(&pool);
    let po = repo
        .create_purchase_order(
            &NewPurchaseOrder {
                organization_id: org,
                supplier_id: None,
                notes: None,
                lines,
            },
            "PO",
        )
        .await
        .unwrap();
    assert_eq!(po.transaction.total_amount_cents, 498 + 350);
    assert_eq!(po.transaction.status, "pending_approval");
    assert!(po.transaction.transaction_code.starts_with("PO-"));

    let owner = EntityRepo::new(&pool)
        .create(
            org,
            &user_from_record(&UserRecord {
                name: "Olga".into(),
                email: "olga@example.com".into(),
                role: "owner".into(),
            })
            .unwrap(),
        )
        .await
        .unwrap();

    let rejected = repo
        .set_status(
            org,
            po.transaction.id,
            PoStatus::PendingApproval,
            PoStatus::Rejected,
            owner.entity.id,
            Some("Rejected: too expensive"),
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, "rejected");
    assert_eq!(rejected.notes.as_deref(), Some("Rejected: too expensive"));
    assert_eq!(rejected.approved_by, Some(owner.entity.id));

    let stale = repo
        .set_status(
            org,
            po.transaction.id,
            PoStatus::PendingApproval,
            PoStatus::Approved,
            owner.entity.id,
            None,
        )
        .await;
    assert!(matches!(stale, Err(DbError::Conflict(_))));

    let role = DynamicDataRepo::new(&pool)
        .text_field(org, owner.entity.id, "user", "role")
        .await
        .unwrap();
    assert_eq!(role.as_deref(), Some("owner"));

    let listed = repo
        .list(
            &PurchaseOrderFilter {
                organization_id: org,
                status: Some(PoStatus::Rejected),
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(listed.total, 1);

    let with_lines = repo.get_with_lines(org, po.transaction.id).await.unwrap();
    assert_eq!(with_lines.lines.len(), 2);
    assert_eq!(with_lines.lines[0].line_amount_cents, 498);
}

async fn single_line_order(pool: &PgPool, org: Uuid, unit_price_cents: i64) -> Uuid {
    let lines = OrderLines::new(vec![OrderLineInput {
        entity_id: None,
        description: "Olive oil".into(),
        quantity: 1.0,
        unit_price_cents,
    }])
    .unwrap();

    TransactionRepo::new(pool)
        .create_purchase_order(
            &NewPurchaseOrder {
                organization_id: org,
                supplier_id: None,
                notes: None,
                lines,
            },
            "PO",
        )
        .await
        .unwrap()
        .transaction
        .id
}

#[tokio::test]
#[ignore = "requires database"]
async fn purchase_orders_are_scoped_by_organization() {
    let pool = pool().await;
    let org = organization(&pool, "PO Scope A").await;
    let other = organization(&pool, "PO Scope B").await;
    let id = single_line_order(&pool, org, 1200).await;
    let repo = TransactionRepo::new(&pool);

    assert!(matches!(
        repo.get_with_lines(other, id).await,
        Err(DbError::NotFound { .. })
    ));
    assert!(matches!(repo.get(other, id).await, Err(DbError::NotFound { .. })));

    let write = repo
        .set_status(
            other,
            id,
            PoStatus::PendingApproval,
            PoStatus::Approved,
            Uuid::new_v4(),
            None,
        )
        .await;
    assert!(matches!(write, Err(DbError::NotFound { .. })));
    assert_eq!(repo.get(org, id).await.unwrap().status, "pending_approval");
}

#[tokio::test]
#[ignore = "requires database"]
async fn escalation_keeps_decision_columns_empty() {
    let pool = pool().await;
    let org = organization(&pool, "Escalation").await;
    let id = single_line_order(&pool, org, 900_000).await;
    let manager = Uuid::new_v4();
    let repo = TransactionRepo::new(&pool);

    let escalated = repo
        .set_status(
            org,
            id,
            PoStatus::PendingApproval,
            PoStatus::Escalated,
            manager,
            Some("Escalated by manager: over manager approval limit"),
        )
        .await
        .unwrap();
    assert_eq!(escalated.status, "escalated");
    assert_eq!(escalated.approved_by, None);
    assert_eq!(escalated.approved_at, None);
    assert!(escalated.notes.unwrap().starts_with("Escalated by"));

    let owner = Uuid::new_v4();
    let approved = repo
        .set_status(org, id, PoStatus::Escalated, PoStatus::Approved, owner, None)
        .await
        .unwrap();
    assert_eq!(approved.approved_by, Some(owner));
    assert!(approved.approved_at.is_some());
    assert!(approved.notes.unwrap().starts_with("Escalated by"));
}

#[tokio::test]
#[ignore = "requires database"]
async fn search_matches_name_or_code() {
    let pool = pool().await;
    let org = organization(&pool, "Search").await;
    let repo = EntityRepo::new(&pool);
    repo.create(org, &menu_item("Flat White", Some("FW-01"))).await.unwrap();
    repo.create(org, &menu_item("Cortado", None)).await.unwrap();

    let by_code = EntityFilter {
        entity_type: None,
        search: Some("fw-0".into()),
    };
    let page = repo.list(org, &by_code, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].entity.entity_name, "Flat White");

    let by_name = EntityFilter {
        entity_type: None,
        search: Some("CORT".into()),
    };
    assert_eq!(repo.list(org, &by_name, Pagination::default()).await.unwrap().total, 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn field_delete_needs_active_entity() {
    let pool = pool().await;
    let org = organization(&pool, "Field Delete").await;
    let entities = EntityRepo::new(&pool);
    let fields = DynamicDataRepo::new(&pool);
    let price = FieldName::new("price_cents").unwrap();

    let kept = entities.create(org, &menu_item("Kept", None)).await.unwrap();
    fields.delete(org, kept.entity.id, &price).await.unwrap();
    assert!(matches!(
        fields.delete(org, kept.entity.id, &price).await,
        Err(DbError::NotFound { resource: "field", .. })
    ));

    let gone = entities.create(org, &menu_item("Gone", None)).await.unwrap();
    entities.deactivate(org, gone.entity.id).await.unwrap();
    assert!(matches!(
        fields.delete(org, gone.entity.id, &price).await,
        Err(DbError::NotFound { resource: "entity", .. })
    ));
}

#[tokio::test]
#[ignore = "requires database"]
async fn bulk_upload_reports_per_record() {
    let pool = pool().await;
    let org = organization(&pool, "Bulk").await;

    let records = vec![
        json!({ "entity_type": "supplier", "entity_name": "Acme", "entity_code": "ACME" }),
        json!({ "entity_type": "supplier", "entity_name": "Acme Again", "entity_code": "ACME" }),
        json!({ "entity_name": "No Type" }),
    ];
    let parsed = parse_records(BulkKind::Entities, records, 10).unwrap();
    let report = bulk_upload::upload(&pool, org, parsed).await.unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(report.errors[0].index, 1);
    assert_eq!(report.errors[1].index, 2);
}

#[tokio::test]
#[ignore = "requires database"]
async fn bulk_upload_nul_record_fails_alone() {
    let pool = pool().await;
    let org = organization(&pool, "Bulk NUL").await;

    let records = vec![
        json!({ "entity_type": "supplier", "entity_name": "Acme" }),
        json!({ "entity_type": "supplier", "entity_name": "Bad\u{0}Name" }),
        json!({ "entity_type": "supplier", "entity_name": "Zeta", "fields": { "note": "a\u{0}b" } }),
        json!({ "entity_type": "supplier", "entity_name": "Omega" }),
    ];
    let parsed = parse_records(BulkKind::Entities, records, 10).unwrap();
    let report = bulk_upload::upload(&pool, org, parsed).await.unwrap();

    assert_eq!(report.created, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(report.errors[0].index, 1);
    assert_eq!(report.errors[1].index, 2);
}

#[tokio::test]
#[ignore = "requires database"]
async fn deploy_then_clone() {
    let pool = pool().await;
    let template = Template::builtin("restaurant").unwrap().unwrap();
    let deployer = TemplateDeployer::new(&pool);

    let deployed = deployer
        .deploy_template(&template, &OrganizationName::new("Trattoria").unwrap())
        .await
        .unwrap();
    assert_eq!(deployed.entities_created, template.entities.len());

    let cloned = deployer
        .clone_organization(
            deployed.organization_id,
            &OrganizationName::new("Trattoria Two").unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(cloned.entities_created, deployed.entities_created);
    assert_eq!(cloned.relationships_created, deployed.relationships_created);
    assert_ne!(cloned.organization_id, deployed.organization_id);
}
