//! Universal schema: organizations, entities, dynamic data, relationships,
//! metadata, transactions and transaction lines.
//!
//! Every statement is idempotent so the server can run it on each start.

use sqlx::PgPool;

const TABLES: &[(&str, &str)] = &[
    (
        "core_organizations",
        r#"
        CREATE TABLE IF NOT EXISTS core_organizations (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            organization_name TEXT NOT NULL,
            organization_code TEXT NOT NULL UNIQUE,
            organization_type TEXT NOT NULL DEFAULT 'restaurant',
            industry TEXT,
            settings JSONB NOT NULL DEFAULT '{}'::jsonb,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "core_entities",
        r#"
        CREATE TABLE IF NOT EXISTS core_entities (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            organization_id UUID NOT NULL REFERENCES core_organizations(id),
            entity_type TEXT NOT NULL,
            entity_name TEXT NOT NULL,
            entity_code TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "core_dynamic_data",
        r#"
        CREATE TABLE IF NOT EXISTS core_dynamic_data (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            organization_id UUID NOT NULL REFERENCES core_organizations(id),
            entity_id UUID NOT NULL REFERENCES core_entities(id) ON DELETE CASCADE,
            field_name TEXT NOT NULL,
            field_type TEXT NOT NULL,
            field_value_text TEXT,
            field_value_number DOUBLE PRECISION,
            field_value_boolean BOOLEAN,
            field_value_json JSONB,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (entity_id, field_name)
        )
        "#,
    ),
    (
        "core_relationships",
        r#"
        CREATE TABLE IF NOT EXISTS core_relationships (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            organization_id UUID NOT NULL REFERENCES core_organizations(id),
            source_entity_id UUID NOT NULL REFERENCES core_entities(id) ON DELETE CASCADE,
            target_entity_id UUID NOT NULL REFERENCES core_entities(id) ON DELETE CASCADE,
            relationship_type TEXT NOT NULL,
            metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (source_entity_id, target_entity_id, relationship_type),
            CHECK (source_entity_id <> target_entity_id)
        )
        "#,
    ),
    (
        "core_metadata",
        r#"
        CREATE TABLE IF NOT EXISTS core_metadata (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            organization_id UUID NOT NULL REFERENCES core_organizations(id),
            entity_id UUID NOT NULL REFERENCES core_entities(id) ON DELETE CASCADE,
            metadata_key TEXT NOT NULL,
            metadata_value JSONB NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (entity_id, metadata_key)
        )
        "#,
    ),
    (
        "universal_transactions",
        r#"
        CREATE TABLE IF NOT EXISTS universal_transactions (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            organization_id UUID NOT NULL REFERENCES core_organizations(id),
            transaction_type TEXT NOT NULL,
            transaction_code TEXT NOT NULL UNIQUE,
            reference_entity_id UUID REFERENCES core_entities(id),
            status TEXT NOT NULL,
            total_amount_cents BIGINT NOT NULL DEFAULT 0,
            notes TEXT,
            approved_by UUID REFERENCES core_entities(id),
            approved_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "universal_transaction_lines",
        r#"
        CREATE TABLE IF NOT EXISTS universal_transaction_lines (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            transaction_id UUID NOT NULL REFERENCES universal_transactions(id) ON DELETE CASCADE,
            line_number INTEGER NOT NULL,
            entity_id UUID REFERENCES core_entities(id),
            description TEXT NOT NULL,
            quantity DOUBLE PRECISION NOT NULL,
            unit_price_cents BIGINT NOT NULL,
            line_amount_cents BIGINT NOT NULL,
            UNIQUE (transaction_id, line_number)
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_entities_org_type ON core_entities(organization_id, entity_type) WHERE is_active",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_entities_org_type_code ON core_entities(organization_id, entity_type, entity_code) WHERE entity_code IS NOT NULL AND is_active",
    "CREATE INDEX IF NOT EXISTS idx_dynamic_data_entity ON core_dynamic_data(entity_id)",
    "CREATE INDEX IF NOT EXISTS idx_dynamic_data_org_field ON core_dynamic_data(organization_id, field_name)",
    "CREATE INDEX IF NOT EXISTS idx_relationships_source ON core_relationships(source_entity_id) WHERE is_active",
    "CREATE INDEX IF NOT EXISTS idx_relationships_target ON core_relationships(target_entity_id) WHERE is_active",
    "CREATE INDEX IF NOT EXISTS idx_transactions_org_type_status ON universal_transactions(organization_id, transaction_type, status)",
    "CREATE INDEX IF NOT EXISTS idx_transaction_lines_tx ON universal_transaction_lines(transaction_id)",
];

/// Create all tables and indexes.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running schema migrations...");

    for (table, ddl) in TABLES {
        tracing::debug!(table, "ensuring table");
        sqlx::query(ddl).execute(pool).await?;
    }

    for ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::info!(tables = TABLES.len(), "Schema migrations complete");
    Ok(())
}
