//! Storage/volume directory port.

use async_trait::async_trait;

use crate::domain::errors::PortResult;
use crate::domain::models::{PoolId, StoragePool, Volume, WorkloadId};

#[async_trait]
pub trait VolumeDirectory: Send + Sync {
    /// Volumes attached to a workload.
    async fn volumes_for(&self, workload_id: &WorkloadId) -> PortResult<Vec<Volume>>;

    /// Pool metadata, used to skip pools peers cannot observe.
    async fn pool(&self, pool_id: &PoolId) -> PortResult<StoragePool>;
}
