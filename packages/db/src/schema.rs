//! SurrealQL schema for the queue store. Every statement is idempotent.

use crate::{DbError, get_db};

/// Define the `queue` and `workload_group` tables on the shared connection.
pub async fn init_schema() -> Result<(), DbError> {
    let db = get_db()?;

    for (table, schema) in [("queue", QUEUE_SCHEMA), ("workload_group", WORKLOAD_GROUP_SCHEMA)] {
        db.query(schema).await?.check()?;
        tracing::debug!("Schema applied for table {}", table);
    }

    Ok(())
}

/// Queue table schema. Records are keyed by queue name.
const QUEUE_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS queue SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS name ON queue TYPE string;
DEFINE FIELD IF NOT EXISTS uid ON queue TYPE string;
DEFINE FIELD IF NOT EXISTS description ON queue TYPE option<string>;
DEFINE FIELD IF NOT EXISTS spec ON queue TYPE object;
DEFINE FIELD IF NOT EXISTS spec.desired_state ON queue TYPE string DEFAULT "open";
DEFINE FIELD IF NOT EXISTS status ON queue TYPE object;
DEFINE FIELD IF NOT EXISTS status.state ON queue TYPE string DEFAULT "unknown";
DEFINE FIELD IF NOT EXISTS status.counts ON queue TYPE object;
DEFINE FIELD IF NOT EXISTS status.counts.pending ON queue TYPE int DEFAULT 0;
DEFINE FIELD IF NOT EXISTS status.counts.running ON queue TYPE int DEFAULT 0;
DEFINE FIELD IF NOT EXISTS status.counts.unknown ON queue TYPE int DEFAULT 0;
DEFINE FIELD IF NOT EXISTS status.counts.inqueue ON queue TYPE int DEFAULT 0;
DEFINE FIELD IF NOT EXISTS resource_version ON queue TYPE int DEFAULT 1;
DEFINE FIELD IF NOT EXISTS created_at ON queue TYPE datetime DEFAULT time::now();
DEFINE FIELD IF NOT EXISTS updated_at ON queue TYPE datetime DEFAULT time::now();

DEFINE INDEX IF NOT EXISTS queue_name ON queue FIELDS name UNIQUE;
DEFINE INDEX IF NOT EXISTS queue_state ON queue FIELDS status.state;
"#;

/// Workload group table schema. Records are keyed by `namespace/name`.
const WORKLOAD_GROUP_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS workload_group SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS key ON workload_group TYPE object;
DEFINE FIELD IF NOT EXISTS key.namespace ON workload_group TYPE string DEFAULT "";
DEFINE FIELD IF NOT EXISTS key.name ON workload_group TYPE string;
DEFINE FIELD IF NOT EXISTS uid ON workload_group TYPE string;
DEFINE FIELD IF NOT EXISTS queue ON workload_group TYPE string;
DEFINE FIELD IF NOT EXISTS phase ON workload_group TYPE string DEFAULT "pending";
DEFINE FIELD IF NOT EXISTS min_member ON workload_group TYPE int DEFAULT 1;
DEFINE FIELD IF NOT EXISTS created_at ON workload_group TYPE datetime DEFAULT time::now();

-- Lookup of the groups bound to a queue
DEFINE INDEX IF NOT EXISTS workload_group_queue ON workload_group FIELDS queue;
DEFINE INDEX IF NOT EXISTS workload_group_phase ON workload_group FIELDS queue, phase;
"#;
