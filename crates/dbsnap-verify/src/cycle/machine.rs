//! Effect-performing shell around the decision functions
//!
//! Each handler run follows the same contract: describe the temporary
//! database, decide, carry out the decision's effect, then persist its
//! transition. Because the description always comes first, a handler can
//! be re-run any number of times for the same step; a crash between the
//! effect and the save is repaired by the next invocation observing the
//! effect's result.

use crate::cycle::decide::{
    Decision, Effect, Members, Observed, decide_alarm, decide_cleanup, decide_modify,
    decide_restore, decide_verify, decide_wait,
};
use crate::monitoring::{StatusSink, verification_status};
use crate::state::{StateSession, StateStore, VerifyState};
use anyhow::{Context, Result};
use dbsnap_common::CheckStatus;
use dbsnap_common::naming::cluster_member_identifier;
use dbsnap_common::tags::verify_resource_tags;
use dbsnap_rds::subnet_group::{prepare_subnet_group, release_subnet_group};
use dbsnap_rds::{Database, RdsError, RdsOperations, RestoreRequest, Snapshot};
use dbsnap_rds::{database, safety, snapshots};
use tracing::{debug, info, warn};

/// Upper bound on handler runs per invocation, one per state
pub const MAX_STEPS: usize = 6;

/// Result of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The trigger did not concern any known verification
    Ignored { reason: String },
    /// Handlers ran; `from == to` when nothing changed
    Advanced {
        database: String,
        from: VerifyState,
        to: VerifyState,
        steps: usize,
    },
}

/// What a handler saw before deciding
struct Facts {
    database: Option<Database>,
    observed: Observed,
}

impl Facts {
    fn none() -> Self {
        Self {
            database: None,
            observed: Observed::Absent,
        }
    }
}

/// Drives one document through its handlers
pub struct Machine<'a, R, S, K> {
    rds: &'a R,
    session: StateSession<'a, S>,
    sink: &'a K,
}

impl<'a, R, S, K> Machine<'a, R, S, K>
where
    R: RdsOperations,
    S: StateStore,
    K: StatusSink,
{
    pub fn new(rds: &'a R, session: StateSession<'a, S>, sink: &'a K) -> Self {
        Self { rds, session, sink }
    }

    /// Run the handler for the current state, following chained
    /// transitions until a handler has to wait.
    pub async fn run(mut self) -> Result<Outcome> {
        let from = self.session.current_state();
        let mut steps = 0;
        loop {
            steps += 1;
            let chain = self.step().await?;
            if !chain {
                break;
            }
            if steps >= MAX_STEPS {
                warn!(
                    database = %self.session.document().database,
                    steps,
                    "Stopping chained handlers"
                );
                break;
            }
        }

        Ok(Outcome::Advanced {
            database: self.session.document().database.clone(),
            from,
            to: self.session.current_state(),
            steps,
        })
    }

    /// One handler run. Returns whether the next handler should run too.
    async fn step(&mut self) -> Result<bool> {
        let state = self.session.current_state();
        let (decision, facts) = self.decide(state).await?;

        info!(
            database = %self.session.document().database,
            tmp_database = %self.session.document().tmp_database,
            state = %state,
            "{}",
            decision.note
        );

        let Decision {
            effect,
            transition,
            chain,
            ..
        } = decision;
        let finishes_cycle = effect == Effect::FinishCycle;

        self.apply(effect, facts.database.as_ref()).await?;
        let Some(to) = transition else {
            return Ok(false);
        };
        self.session.transition(to).await?;

        if finishes_cycle {
            self.report(CheckStatus::Ok);
        }
        Ok(chain)
    }

    async fn decide(&self, state: VerifyState) -> Result<(Decision, Facts)> {
        let document = self.session.document();
        match state {
            VerifyState::Wait => {
                info!(
                    database = %document.database,
                    verified = ?document.snapshot_verified,
                    "Looking for a newer snapshot"
                );
                let latest =
                    snapshots::latest(self.rds, &document.database, document.snapshot_type()?)
                        .await?;
                Ok((decide_wait(document, &latest.id), Facts::none()))
            }
            VerifyState::Restore => {
                let facts = self.observe().await?;
                Ok((decide_restore(facts.observed), facts))
            }
            VerifyState::Modify => {
                let facts = self.observe().await?;
                if facts.observed == Observed::Absent {
                    warn!(tmp_database = %document.tmp_database, "Temporary database not found in modify");
                }
                Ok((decide_modify(facts.observed), facts))
            }
            VerifyState::Verify => {
                let facts = self.observe().await?;
                let reset = match (&facts.database, facts.observed) {
                    (Some(db), Observed::Available(_)) => {
                        database::credentials_reset(&database::event_messages(self.rds, db).await?)
                    }
                    (None, _) => {
                        warn!(tmp_database = %document.tmp_database, "Temporary database not found in verify");
                        false
                    }
                    _ => false,
                };
                Ok((decide_verify(facts.observed, reset), facts))
            }
            VerifyState::Cleanup => {
                let facts = self.observe().await?;
                Ok((decide_cleanup(facts.observed), facts))
            }
            VerifyState::Alarm => Ok((decide_alarm(), Facts::none())),
        }
    }

    /// Describe the temporary database and, for an available cluster,
    /// its first member
    async fn observe(&self) -> Result<Facts> {
        let tmp_database = &self.session.document().tmp_database;
        let Some(db) = database::describe(self.rds, tmp_database).await? else {
            return Ok(Facts::none());
        };

        let observed = if !db.is_available() {
            Observed::Pending
        } else if !db.is_cluster() {
            Observed::Available(Members::Standalone)
        } else {
            let members = match database::first_member_available(self.rds, &db).await? {
                None => Members::Missing,
                Some(false) => Members::Pending,
                Some(true) => Members::Available,
            };
            Observed::Available(members)
        };
        debug!(tmp_database = %tmp_database, status = %db.status(), ?observed, "Observed temporary database");

        Ok(Facts {
            database: Some(db),
            observed,
        })
    }

    async fn apply(&mut self, effect: Effect, db: Option<&Database>) -> Result<()> {
        match effect {
            Effect::None => {}
            Effect::BeginVerifying { snapshot_id } => {
                self.session.document_mut().snapshot_verifying = Some(snapshot_id);
            }
            Effect::StartRestore => self.start_restore().await?,
            Effect::CreateClusterMember => {
                let cluster = db.context("Cluster disappeared before member creation")?;
                let member_id = cluster_member_identifier(cluster.id());
                database::create_member_instance(
                    self.rds,
                    cluster,
                    &member_id,
                    &self.session.document().cluster_instance_class,
                )
                .await?;
                info!(cluster = %cluster.id(), member = %member_id, "Creating cluster member instance");
            }
            Effect::ModifyForVerification => {
                let db = db.context("Temporary database disappeared before modify")?;
                let password = database::modify_for_verification(
                    self.rds,
                    db,
                    &self.session.document().database_security_group_ids,
                )
                .await?;
                self.session.document_mut().tmp_password = Some(password);
            }
            Effect::Destroy => {
                let db = db.context("Temporary database disappeared before destroy")?;
                safety::destroy_database(self.rds, db).await?;
            }
            Effect::FinishCycle => {
                let tmp_database = self.session.document().tmp_database.clone();
                release_subnet_group(self.rds, &tmp_database).await?;
                self.session.document_mut().clean();
            }
            Effect::RaiseAlarm => self.report(CheckStatus::Critical),
        }
        Ok(())
    }

    /// Restore the snapshot under verification into the temporary database
    async fn start_restore(&mut self) -> Result<()> {
        let snapshot = self.restore_snapshot().await?;
        let document = self.session.document();
        let tmp_database = document.tmp_database.clone();

        info!(
            database = %document.database,
            tmp_database = %tmp_database,
            snapshot_id = %snapshot.id,
            "Restoring snapshot"
        );
        prepare_subnet_group(self.rds, &tmp_database, &document.database_subnet_ids).await?;
        self.rds
            .restore_from_snapshot(&RestoreRequest {
                target_id: tmp_database.clone(),
                snapshot,
                subnet_group: tmp_database.clone(),
                tags: verify_resource_tags(&tmp_database),
            })
            .await
    }

    /// The snapshot recorded in `snapshot_verifying`, or the latest one
    /// when that snapshot has since expired
    async fn restore_snapshot(&mut self) -> Result<Snapshot> {
        let document = self.session.document();
        let database = document.database.clone();
        let mut available =
            snapshots::list_available(self.rds, &database, document.snapshot_type()?).await?;

        let wanted = document.snapshot_verifying.as_deref();
        if let Some(pos) = wanted.and_then(|id| available.iter().position(|s| s.id == id)) {
            return Ok(available.swap_remove(pos));
        }

        let latest = available
            .pop()
            .ok_or(RdsError::NoSnapshotAvailable { database })?;
        warn!(
            wanted = ?wanted,
            snapshot_id = %latest.id,
            "Snapshot under verification is gone, restoring the latest one"
        );
        self.session.document_mut().snapshot_verifying = Some(latest.id.clone());
        self.session.persist().await?;
        Ok(latest)
    }

    fn report(&self, status: CheckStatus) {
        self.sink.emit(&verification_status(
            &self.session.document().database,
            status,
        ));
    }
}
