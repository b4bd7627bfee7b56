//! Invocation entry point
//!
//! Resolves the trigger to a state document, opens a provider session in
//! the document's snapshot region and runs the cycle.

use crate::cycle::{Machine, Outcome};
use crate::monitoring::StatusSink;
use crate::state::{StateSession, StateStore};
use crate::trigger::Trigger;
use anyhow::Result;
use dbsnap_common::naming::{CLUSTER_MEMBER_PREFIX, is_temp_identifier, source_identifier};
use dbsnap_rds::RdsOperations;
use std::future::Future;
use tracing::info;

/// Source database for a resource named in a lifecycle event.
///
/// Accepts the temporary database itself and the member instance of a
/// temporary cluster; anything else is unrelated.
pub fn lifecycle_database(source_id: &str) -> Option<&str> {
    let temp = source_id
        .strip_prefix(CLUSTER_MEMBER_PREFIX)
        .filter(|rest| is_temp_identifier(rest))
        .unwrap_or(source_id);
    source_identifier(temp)
}

/// Handle one trigger.
///
/// `connect` builds the provider session for a region. It is only called
/// once the trigger has resolved to a document.
pub async fn dispatch<S, K, R, F, Fut>(
    store: &S,
    sink: &K,
    trigger: Trigger,
    connect: F,
) -> Result<Outcome>
where
    S: StateStore,
    K: StatusSink,
    R: RdsOperations,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let session = match trigger {
        Trigger::Config(config) => {
            config.validate()?;
            let (session, _) = StateSession::get_or_create(store, &config).await?;
            session
        }
        Trigger::Lifecycle { source_id } => {
            let Some(database) = lifecycle_database(&source_id) else {
                info!(source_id = %source_id, "Ignoring event for unrelated resource");
                return Ok(Outcome::Ignored {
                    reason: format!("'{source_id}' is not a verification resource"),
                });
            };
            match StateSession::load(store, database).await? {
                Some(session) => session,
                None => {
                    info!(source_id = %source_id, database = %database, "Ignoring event without state document");
                    return Ok(Outcome::Ignored {
                        reason: format!("no state document for '{database}'"),
                    });
                }
            }
        }
    };

    let document = session.document();
    info!(
        database = %document.database,
        state = %document.current_state(),
        region = %document.snapshot_region,
        "Handling state"
    );
    let rds = connect(document.snapshot_region.clone()).await?;
    Machine::new(&rds, session, sink).run().await
}
