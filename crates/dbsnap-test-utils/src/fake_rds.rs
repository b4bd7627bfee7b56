//! In-memory RDS fake
//!
//! [`FakeRds`] keeps databases, snapshots, subnet groups, tags and events
//! in memory and records every mutating call, so scenario tests can drive
//! the verifier through a full cycle and assert on what it asked for.
//! Clones share state.

use crate::fixtures;
use anyhow::{Result, bail};
use dbsnap_common::Tags;
use dbsnap_rds::{
    ClusterMemberRequest, CopySnapshotRequest, Database, EventSourceType, ModifyRequest,
    RdsOperations, RestoreRequest, Snapshot, SnapshotKind, SnapshotType, SubnetGroup,
    SubnetGroupRequest,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A mutating call recorded by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Restore {
        target_id: String,
        snapshot_id: String,
        subnet_group: String,
    },
    CreateClusterMember {
        instance_id: String,
        cluster_id: String,
        instance_class: String,
    },
    Modify {
        id: String,
        security_group_ids: Vec<String>,
    },
    DeleteInstance(String),
    DeleteCluster(String),
    CreateSubnetGroup(String),
    DeleteSubnetGroup(String),
    CopySnapshot {
        source_id: String,
        target_id: String,
    },
    DeleteSnapshot(String),
}

#[derive(Default)]
struct FakeState {
    instances: BTreeMap<String, Database>,
    clusters: BTreeMap<String, Database>,
    snapshots: Vec<Snapshot>,
    subnet_groups: BTreeMap<String, SubnetGroup>,
    tags: HashMap<String, Tags>,
    events: HashMap<(String, EventSourceType), Vec<String>>,
    calls: Vec<Call>,
    failing: BTreeSet<&'static str>,
}

/// In-memory stand-in for [`dbsnap_rds::RdsClient`]
#[derive(Clone)]
pub struct FakeRds {
    region: String,
    state: Arc<Mutex<FakeState>>,
}

impl FakeRds {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            state: Arc::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call to the named operation fail until cleared
    pub fn fail_on(&self, operation: &'static str) {
        self.lock().failing.insert(operation);
    }

    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.lock().failing.contains(operation) {
            bail!("injected failure in {operation}");
        }
        Ok(())
    }

    pub fn add_instance(&self, id: &str, status: &str, tags: &[(&str, &str)]) -> Database {
        let db = fixtures::instance(&self.region, id, status);
        let mut state = self.lock();
        state.tags.insert(db.arn().to_string(), to_tags(tags));
        state.instances.insert(id.to_string(), db.clone());
        db
    }

    pub fn add_cluster(
        &self,
        id: &str,
        status: &str,
        members: &[&str],
        tags: &[(&str, &str)],
    ) -> Database {
        let db = fixtures::cluster(&self.region, id, status, members);
        let mut state = self.lock();
        state.tags.insert(db.arn().to_string(), to_tags(tags));
        state.clusters.insert(id.to_string(), db.clone());
        db
    }

    /// Set the status of an instance or cluster
    pub fn set_status(&self, id: &str, status: &str) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let found = state
            .instances
            .get_mut(id)
            .into_iter()
            .chain(state.clusters.get_mut(id));
        for db in found {
            match db {
                Database::Instance(info) => info.status = status.to_string(),
                Database::Cluster { info, .. } => info.status = status.to_string(),
            }
        }
    }

    /// Remove an instance or cluster, as when a delete completes
    pub fn remove_database(&self, id: &str) {
        let mut state = self.lock();
        state.instances.remove(id);
        if let Some(cluster) = state.clusters.remove(id) {
            for member in cluster.members() {
                state.instances.remove(member);
            }
        }
    }

    pub fn database(&self, id: &str) -> Option<Database> {
        let state = self.lock();
        state
            .instances
            .get(id)
            .or_else(|| state.clusters.get(id))
            .cloned()
    }

    pub fn add_snapshot(&self, snapshot: Snapshot, tags: &[(&str, &str)]) {
        let mut state = self.lock();
        state.tags.insert(snapshot.arn.clone(), to_tags(tags));
        state.snapshots.push(snapshot);
    }

    pub fn snapshot(&self, id: &str) -> Option<Snapshot> {
        self.lock().snapshots.iter().find(|s| s.id == id).cloned()
    }

    pub fn add_subnet_group(&self, name: &str, tags: &[(&str, &str)]) {
        let group = SubnetGroup {
            name: name.to_string(),
            arn: fixtures::subnet_group_arn(&self.region, name),
            status: "Complete".to_string(),
        };
        let mut state = self.lock();
        state.tags.insert(group.arn.clone(), to_tags(tags));
        state.subnet_groups.insert(name.to_string(), group);
    }

    pub fn subnet_group(&self, name: &str) -> Option<SubnetGroup> {
        self.lock().subnet_groups.get(name).cloned()
    }

    /// Tags currently stored for an ARN
    pub fn tags_for(&self, arn: &str) -> Tags {
        self.lock().tags.get(arn).cloned().unwrap_or_default()
    }

    /// Record an event message, reported under the `db-instance` source type
    pub fn add_event(&self, id: &str, message: &str) {
        self.add_event_for(id, EventSourceType::DbInstance, message);
    }

    /// Record an event message under the given source type
    pub fn add_event_for(&self, id: &str, source_type: EventSourceType, message: &str) {
        self.lock()
            .events
            .entry((id.to_string(), source_type))
            .or_default()
            .push(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }

    fn list_snapshots(
        &self,
        database: &str,
        kind: SnapshotKind,
        snapshot_type: Option<SnapshotType>,
    ) -> Vec<Snapshot> {
        self.lock()
            .snapshots
            .iter()
            .filter(|s| s.kind == kind && s.source_database == database)
            .filter(|s| snapshot_type.is_none_or(|t| s.snapshot_type == t.as_ref()))
            .cloned()
            .collect()
    }
}

fn to_tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn owned_tags(pairs: &[(String, String)]) -> Tags {
    pairs.iter().cloned().collect()
}

impl RdsOperations for FakeRds {
    fn region(&self) -> String {
        self.region.clone()
    }

    async fn describe_db_instance(&self, id: &str) -> Result<Option<Database>> {
        self.check("describe_db_instance")?;
        Ok(self.lock().instances.get(id).cloned())
    }

    async fn describe_db_cluster(&self, id: &str) -> Result<Option<Database>> {
        self.check("describe_db_cluster")?;
        Ok(self.lock().clusters.get(id).cloned())
    }

    async fn describe_db_snapshots(
        &self,
        database: &str,
        snapshot_type: Option<SnapshotType>,
    ) -> Result<Vec<Snapshot>> {
        self.check("describe_db_snapshots")?;
        Ok(self.list_snapshots(database, SnapshotKind::Instance, snapshot_type))
    }

    async fn describe_db_cluster_snapshots(
        &self,
        database: &str,
        snapshot_type: Option<SnapshotType>,
    ) -> Result<Vec<Snapshot>> {
        self.check("describe_db_cluster_snapshots")?;
        Ok(self.list_snapshots(database, SnapshotKind::Cluster, snapshot_type))
    }

    async fn list_tags(&self, arn: &str) -> Result<Tags> {
        self.check("list_tags")?;
        Ok(self.tags_for(arn))
    }

    async fn restore_from_snapshot(&self, request: &RestoreRequest) -> Result<()> {
        self.check("restore_from_snapshot")?;
        self.record(Call::Restore {
            target_id: request.target_id.clone(),
            snapshot_id: request.snapshot.id.clone(),
            subnet_group: request.subnet_group.clone(),
        });

        let mut state = self.lock();
        match request.snapshot.kind {
            SnapshotKind::Instance => {
                let db = fixtures::instance(&self.region, &request.target_id, "creating");
                state.tags.insert(db.arn().to_string(), owned_tags(&request.tags));
                state.instances.insert(request.target_id.clone(), db);
            }
            SnapshotKind::Cluster => {
                let db = fixtures::cluster(&self.region, &request.target_id, "creating", &[]);
                state.tags.insert(db.arn().to_string(), owned_tags(&request.tags));
                state.clusters.insert(request.target_id.clone(), db);
            }
        }
        Ok(())
    }

    async fn create_db_instance_in_cluster(&self, request: &ClusterMemberRequest) -> Result<()> {
        self.check("create_db_instance_in_cluster")?;
        self.record(Call::CreateClusterMember {
            instance_id: request.instance_id.clone(),
            cluster_id: request.cluster_id.clone(),
            instance_class: request.instance_class.clone(),
        });

        let mut state = self.lock();
        let Some(Database::Cluster { members, .. }) = state.clusters.get_mut(&request.cluster_id)
        else {
            bail!("DBClusterNotFoundFault: {}", request.cluster_id);
        };
        members.push(request.instance_id.clone());

        let member = fixtures::instance(&self.region, &request.instance_id, "creating");
        state
            .tags
            .insert(member.arn().to_string(), owned_tags(&request.tags));
        state.instances.insert(request.instance_id.clone(), member);
        Ok(())
    }

    async fn modify_for_verification(
        &self,
        database: &Database,
        request: &ModifyRequest,
    ) -> Result<()> {
        self.check("modify_for_verification")?;
        self.record(Call::Modify {
            id: database.id().to_string(),
            security_group_ids: request.security_group_ids.clone(),
        });
        Ok(())
    }

    async fn delete_db_instance(&self, id: &str) -> Result<()> {
        self.check("delete_db_instance")?;
        self.record(Call::DeleteInstance(id.to_string()));
        self.set_status(id, "deleting");
        Ok(())
    }

    async fn delete_db_cluster(&self, id: &str) -> Result<()> {
        self.check("delete_db_cluster")?;
        self.record(Call::DeleteCluster(id.to_string()));
        self.set_status(id, "deleting");
        Ok(())
    }

    async fn describe_subnet_group(&self, name: &str) -> Result<Option<SubnetGroup>> {
        self.check("describe_subnet_group")?;
        Ok(self.subnet_group(name))
    }

    async fn create_subnet_group(&self, request: &SubnetGroupRequest) -> Result<SubnetGroup> {
        self.check("create_subnet_group")?;
        self.record(Call::CreateSubnetGroup(request.name.clone()));

        let group = SubnetGroup {
            name: request.name.clone(),
            arn: fixtures::subnet_group_arn(&self.region, &request.name),
            status: "Complete".to_string(),
        };
        let mut state = self.lock();
        if state.subnet_groups.contains_key(&request.name) {
            bail!("DBSubnetGroupAlreadyExists: {}", request.name);
        }
        state.tags.insert(group.arn.clone(), owned_tags(&request.tags));
        state.subnet_groups.insert(request.name.clone(), group.clone());
        Ok(group)
    }

    async fn delete_subnet_group(&self, name: &str) -> Result<()> {
        self.check("delete_subnet_group")?;
        self.record(Call::DeleteSubnetGroup(name.to_string()));
        self.lock().subnet_groups.remove(name);
        Ok(())
    }

    async fn event_messages(
        &self,
        source_id: &str,
        source_type: EventSourceType,
        _duration_minutes: i32,
    ) -> Result<Vec<String>> {
        self.check("event_messages")?;
        Ok(self
            .lock()
            .events
            .get(&(source_id.to_string(), source_type))
            .cloned()
            .unwrap_or_default())
    }

    async fn copy_snapshot(&self, request: &CopySnapshotRequest) -> Result<Snapshot> {
        self.check("copy_snapshot")?;
        self.record(Call::CopySnapshot {
            source_id: request.source.id.clone(),
            target_id: request.target_id.clone(),
        });

        let kind = request.source.kind;
        let copy = Snapshot {
            id: request.target_id.clone(),
            arn: fixtures::snapshot_arn(&self.region, kind, &request.target_id),
            status: "creating".to_string(),
            created_time: None,
            snapshot_type: SnapshotType::Manual.to_string(),
            kind,
            source_database: request.source.source_database.clone(),
            engine: request.source.engine.clone(),
            kms_key_id: request.kms_key_id.clone(),
        };
        let mut state = self.lock();
        state.tags.insert(copy.arn.clone(), owned_tags(&request.tags));
        state.snapshots.push(copy.clone());
        Ok(copy)
    }

    async fn delete_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        self.check("delete_snapshot")?;
        self.record(Call::DeleteSnapshot(snapshot.id.clone()));
        self.lock().snapshots.retain(|s| s.id != snapshot.id);
        Ok(())
    }
}

impl std::fmt::Debug for FakeRds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeRds")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}
