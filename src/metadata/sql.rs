//! Introspection queries run through the engine's `run_sql` endpoint.
//!
//! Both dialects return the same shapes:
//!
//! - tables: one row per table or view,
//!   `(table_schema, table_name, table_type, comment, columns_json)`;
//! - foreign keys: a single JSON array of constraints with `column_mapping`
//!   pairs and an `is_unique` flag telling whether the owning table's FK
//!   columns are covered by a unique index.

use super::types::SourceKind;

/// Table introspection query for a source kind.
pub fn tables_query(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Mssql => MSSQL_TABLES,
        SourceKind::Postgres => POSTGRES_TABLES,
    }
}

/// Foreign-key introspection query for a source kind.
pub fn foreign_keys_query(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Mssql => MSSQL_FOREIGN_KEYS,
        SourceKind::Postgres => POSTGRES_FOREIGN_KEYS,
    }
}

const MSSQL_TABLES: &str = r#"
SELECT sch.name AS table_schema,
    obj.name AS table_name,
    CASE
        WHEN obj.type = 'U' THEN 'TABLE'
        WHEN obj.type = 'V' THEN 'VIEW'
    END AS table_type,
    obj.type_desc AS comment,
    JSON_QUERY([isc].json) AS columns
FROM sys.objects AS obj
    INNER JOIN sys.schemas AS sch ON obj.schema_id = sch.schema_id
    OUTER APPLY (
        SELECT
            a.name AS column_name,
            a.column_id AS ordinal_position,
            ad.definition AS column_default,
            a.collation_name AS collation_name,
            CASE
                WHEN a.is_nullable = 0 OR t.is_nullable = 0 THEN 'NO'
                ELSE 'YES'
            END AS is_nullable,
            CASE
                WHEN t.is_table_type = 1 THEN 'TABLE'
                WHEN t.is_assembly_type = 1 THEN 'ASSEMBLY'
                WHEN t.is_user_defined = 1 THEN 'USER-DEFINED'
                ELSE 'OTHER'
            END AS data_type,
            t.name AS data_type_name
        FROM sys.columns a
            LEFT JOIN sys.default_constraints ad
                ON (a.column_id = ad.parent_column_id AND a.object_id = ad.parent_object_id)
            JOIN sys.types t ON a.user_type_id = t.user_type_id
        WHERE a.column_id > 0 AND a.object_id = obj.object_id
        FOR JSON PATH
    ) AS [isc](json)
WHERE obj.type_desc IN ('USER_TABLE', 'VIEW')
"#;

const MSSQL_FOREIGN_KEYS: &str = r#"
SELECT
    fk.name AS constraint_name,
    sch1.name AS [table_schema],
    tab1.name AS [table_name],
    sch2.name AS [ref_table_schema],
    tab2.name AS [ref_table],
    (
        SELECT
            col1.name AS [column],
            col2.name AS [referenced_column]
        FROM sys.foreign_key_columns fkc
        INNER JOIN sys.columns col1
            ON col1.column_id = fkc.parent_column_id AND col1.object_id = tab1.object_id
        INNER JOIN sys.columns col2
            ON col2.column_id = fkc.referenced_column_id AND col2.object_id = tab2.object_id
        WHERE fk.object_id = fkc.constraint_object_id
        ORDER BY fkc.constraint_column_id
        FOR JSON PATH
    ) AS column_mapping,
    fk.delete_referential_action_desc AS [on_delete],
    fk.update_referential_action_desc AS [on_update],
    CASE WHEN EXISTS (
        SELECT 1
        FROM sys.indexes ix
        WHERE ix.object_id = fk.parent_object_id
            AND ix.is_unique = 1
            AND NOT EXISTS (
                SELECT ic.column_id
                FROM sys.index_columns ic
                WHERE ic.object_id = ix.object_id
                    AND ic.index_id = ix.index_id
                    AND ic.is_included_column = 0
                EXCEPT
                SELECT fkc.parent_column_id
                FROM sys.foreign_key_columns fkc
                WHERE fkc.constraint_object_id = fk.object_id
            )
    ) THEN CAST(1 AS bit) ELSE CAST(0 AS bit) END AS [is_unique]
FROM sys.foreign_keys fk
INNER JOIN sys.tables tab1
    ON tab1.object_id = fk.parent_object_id
INNER JOIN sys.schemas sch1
    ON tab1.schema_id = sch1.schema_id
INNER JOIN sys.tables tab2
    ON tab2.object_id = fk.referenced_object_id
INNER JOIN sys.schemas sch2
    ON tab2.schema_id = sch2.schema_id
FOR JSON PATH
"#;

const POSTGRES_TABLES: &str = r#"
SELECT t.table_schema,
    t.table_name,
    CASE WHEN t.table_type = 'BASE TABLE' THEN 'TABLE' ELSE t.table_type END AS table_type,
    obj_description(format('%I.%I', t.table_schema, t.table_name)::regclass, 'pg_class') AS comment,
    COALESCE((
        SELECT json_agg(json_build_object(
            'column_name', c.column_name,
            'ordinal_position', c.ordinal_position,
            'column_default', c.column_default,
            'collation_name', c.collation_name,
            'is_nullable', c.is_nullable,
            'data_type', c.data_type,
            'data_type_name', c.udt_name
        ) ORDER BY c.ordinal_position)
        FROM information_schema.columns c
        WHERE c.table_schema = t.table_schema AND c.table_name = t.table_name
    ), '[]'::json)::text AS columns
FROM information_schema.tables t
WHERE t.table_schema NOT IN ('pg_catalog', 'information_schema', 'hdb_catalog')
    AND t.table_schema NOT LIKE 'pg_toast%'
    AND t.table_type IN ('BASE TABLE', 'VIEW')
"#;

const POSTGRES_FOREIGN_KEYS: &str = r#"
SELECT COALESCE(json_agg(json_build_object(
    'constraint_name', con.conname,
    'table_schema', ns.nspname,
    'table_name', cl.relname,
    'ref_table_schema', rns.nspname,
    'ref_table', rcl.relname,
    'column_mapping', (
        SELECT json_agg(json_build_object(
            'column', a.attname,
            'referenced_column', ra.attname
        ) ORDER BY k.ord)
        FROM unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(col, refcol, ord)
        JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.col
        JOIN pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.refcol
    ),
    'on_delete', con.confdeltype,
    'on_update', con.confupdtype,
    'is_unique', EXISTS (
        SELECT 1
        FROM pg_index ix
        WHERE ix.indrelid = con.conrelid
            AND ix.indisunique
            AND (ix.indkey::int2[])[0:ix.indnkeyatts - 1] <@ con.conkey
    )
)), '[]'::json)::text AS foreign_keys
FROM pg_constraint con
JOIN pg_class cl ON cl.oid = con.conrelid
JOIN pg_namespace ns ON ns.oid = cl.relnamespace
JOIN pg_class rcl ON rcl.oid = con.confrelid
JOIN pg_namespace rns ON rns.oid = rcl.relnamespace
WHERE con.contype = 'f'
"#;
