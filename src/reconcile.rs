//! Machine count reconciliation
//!
//! Brings the number of worker machines to a desired count in one pass.
//! The first `reserved` machines in the listing are control-plane members and
//! are never counted or deleted. Scaling up clones the machine at
//! `template_index`; scaling down deletes the machine at `delete_index`. Each
//! step re-lists the machines and changes exactly one of them.
//!
//! Machines already being deleted (a deletion timestamp is set while
//! finalizers run) are left out of every listing before counting or indexing.
//!
//! There is no retry and no rollback: the first failing API call aborts the
//! run and its error is returned.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::client::MachineClient;
use crate::crd::Machine;
use crate::naming::generate_machine_name;
use crate::Error;

/// Number of leading control-plane machines excluded from the worker count
pub const DEFAULT_RESERVED: usize = 2;
/// Index of the machine cloned when scaling up (the third machine)
pub const DEFAULT_TEMPLATE_INDEX: usize = 2;
/// Index of the machine deleted when scaling down (the fourth machine)
pub const DEFAULT_DELETE_INDEX: usize = 3;
/// Worker machines always left in place
pub const DEFAULT_MIN_WORKERS: usize = 1;

/// Fixed offsets that decide which machines are counted, cloned and deleted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScalePolicy {
    /// Leading machines that are control-plane members
    pub reserved: usize,
    /// Index of the template machine cloned on scale-up
    pub template_index: usize,
    /// Index of the machine deleted on scale-down
    pub delete_index: usize,
    /// Worker machines never removed
    pub min_workers: usize,
}

impl Default for ScalePolicy {
    fn default() -> Self {
        Self {
            reserved: DEFAULT_RESERVED,
            template_index: DEFAULT_TEMPLATE_INDEX,
            delete_index: DEFAULT_DELETE_INDEX,
            min_workers: DEFAULT_MIN_WORKERS,
        }
    }
}

impl ScalePolicy {
    /// Validate the policy offsets
    ///
    /// The template and deletion indices must point past the reserved
    /// machines, and the deletion index must exist whenever there are more
    /// than `reserved + min_workers` machines.
    pub fn validate(&self) -> Result<(), Error> {
        if self.min_workers < 1 {
            return Err(Error::validation("min_workers must be at least 1"));
        }
        if self.template_index < self.reserved {
            return Err(Error::validation(format!(
                "template_index {} points at a reserved machine (reserved = {})",
                self.template_index, self.reserved
            )));
        }
        if self.delete_index < self.reserved {
            return Err(Error::validation(format!(
                "delete_index {} points at a reserved machine (reserved = {})",
                self.delete_index, self.reserved
            )));
        }
        if self.delete_index > self.floor() {
            return Err(Error::validation(format!(
                "delete_index {} must be at most reserved + min_workers ({})",
                self.delete_index,
                self.floor()
            )));
        }
        Ok(())
    }

    /// Number of workers among `total` listed machines
    pub fn worker_count(&self, total: usize) -> usize {
        total.saturating_sub(self.reserved)
    }

    /// Smallest total machine count scale-down will leave behind
    pub fn floor(&self) -> usize {
        self.reserved + self.min_workers
    }
}

/// Result of a reconciliation run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScaleOutcome {
    /// Worker count before the run
    pub previous: usize,
    /// Worker count requested
    pub desired: usize,
    /// Worker count after the run
    pub current: usize,
    /// Names of machines created, in order
    pub created: Vec<String>,
    /// Names of machines deleted, in order
    pub deleted: Vec<String>,
}

impl ScaleOutcome {
    /// True if no machine was created or deleted
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty()
    }

    /// True if the run ended at the desired count
    pub fn converged(&self) -> bool {
        self.current == self.desired
    }
}

/// Reconciles the worker machine count against a desired count
pub struct Reconciler {
    client: Arc<dyn MachineClient>,
    policy: ScalePolicy,
}

impl Reconciler {
    /// Create a reconciler with the default policy
    pub fn new(client: Arc<dyn MachineClient>) -> Self {
        Self::with_policy(client, ScalePolicy::default())
    }

    /// Create a reconciler with a custom policy
    pub fn with_policy(client: Arc<dyn MachineClient>, policy: ScalePolicy) -> Self {
        Self { client, policy }
    }

    /// Policy in use
    pub fn policy(&self) -> &ScalePolicy {
        &self.policy
    }

    /// Current number of worker machines
    pub async fn worker_count(&self) -> Result<usize, Error> {
        let machines = self.live_machines().await?;
        Ok(self.policy.worker_count(machines.len()))
    }

    /// List machines, skipping those that are terminating
    async fn live_machines(&self) -> Result<Vec<Machine>, Error> {
        let mut machines = self.client.list_machines().await?;
        let listed = machines.len();
        machines.retain(|m| !m.is_terminating());
        if machines.len() < listed {
            debug!(
                terminating = listed - machines.len(),
                "Skipping terminating machines"
            );
        }
        Ok(machines)
    }

    /// Scale the worker machines to `desired`.
    ///
    /// The number of add or remove steps is fixed from the first listing.
    /// Scale-down stops early once only `reserved + min_workers` machines
    /// remain.
    #[instrument(skip(self), fields(reserved = self.policy.reserved))]
    pub async fn reconcile(&self, desired: usize) -> Result<ScaleOutcome, Error> {
        self.policy.validate()?;

        let machines = self.live_machines().await?;
        let previous = self.policy.worker_count(machines.len());
        let mut outcome = ScaleOutcome {
            previous,
            desired,
            current: previous,
            ..Default::default()
        };

        if previous == desired {
            debug!(workers = previous, "Machine count already matches");
            return Ok(outcome);
        }

        info!(
            total_machines = previous,
            expected_machines = desired,
            "Machine count differs from desired"
        );

        if previous < desired {
            for _ in previous..desired {
                let name = self.add_machine().await?;
                outcome.created.push(name);
                outcome.current += 1;
            }
        } else {
            for _ in desired..previous {
                match self.remove_machine().await? {
                    Some(name) => {
                        outcome.deleted.push(name);
                        outcome.current -= 1;
                    }
                    None => {
                        warn!(
                            desired = desired,
                            min_workers = self.policy.min_workers,
                            "Refusing to remove the last worker machines"
                        );
                        break;
                    }
                }
            }
        }

        info!(
            previous = outcome.previous,
            current = outcome.current,
            created = outcome.created.len(),
            deleted = outcome.deleted.len(),
            "Machine scaling finished"
        );
        Ok(outcome)
    }

    /// Clone the template machine under a new name. Returns the new name.
    async fn add_machine(&self) -> Result<String, Error> {
        let machines = self.live_machines().await?;
        let base = template_machine(&machines, self.policy.template_index)?;
        let base_name = base.metadata.name.as_deref().unwrap_or_default();
        let name = generate_machine_name(base_name)?;

        let provider_config = base.provider_config();
        self.client.create_machine(&base.clone_as(&name)).await?;

        info!(
            template = %base_name,
            machine = %name,
            server_pool = ?provider_config.pool_name(),
            "Added machine"
        );
        Ok(name)
    }

    /// Delete the machine at the deletion index.
    ///
    /// Returns `None` without touching anything when only the minimum number
    /// of workers is left.
    async fn remove_machine(&self) -> Result<Option<String>, Error> {
        let machines = self.live_machines().await?;
        let total = machines.len();

        if total <= self.policy.reserved {
            return Err(Error::InvalidMachineCount {
                found: total,
                reserved: self.policy.reserved,
            });
        }
        if total <= self.policy.floor() {
            return Ok(None);
        }

        let name = machines[self.policy.delete_index]
            .metadata
            .name
            .clone()
            .ok_or_else(|| {
                Error::validation(format!(
                    "machine at index {} has no name",
                    self.policy.delete_index
                ))
            })?;
        self.client.delete_machine(&name).await?;

        info!(machine = %name, "Removed machine");
        Ok(Some(name))
    }
}

/// Pick the template machine out of a listing
fn template_machine(machines: &[Machine], index: usize) -> Result<&Machine, Error> {
    machines.get(index).ok_or(Error::BaseMachineNotFound {
        found: machines.len(),
        required: index + 1,
    })
}
