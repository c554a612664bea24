use std::convert::TryFrom;
use tokio::time::Duration;

#[derive(Clone, Default)]
pub struct RaftOptions {
    pub leader_heartbeat_duration: Option<Duration>,
    pub follower_min_timeout: Option<Duration>,
    pub follower_max_timeout: Option<Duration>,
    pub leader_rpc_timeout: Option<Duration>,
    // A leader that can't reach a quorum for this long steps down.
    pub leader_step_down_timeout: Option<Duration>,
    pub max_entries_per_append: Option<usize>,
    pub snapshot_chunk_size: Option<usize>,
    // Members further behind than this get a snapshot even if the leader still has the entries.
    pub snapshot_replication_threshold: Option<u64>,
    // How long membership changes may take to commit, including forwarding to the leader.
    pub admin_request_timeout: Option<Duration>,
}

#[derive(Clone, Debug)]
pub(super) struct RaftOptionsValidated {
    pub leader_heartbeat_duration: Duration,
    pub follower_min_timeout: Duration,
    pub follower_max_timeout: Duration,
    pub leader_rpc_timeout: Duration,
    pub leader_step_down_timeout: Duration,
    pub max_entries_per_append: usize,
    pub snapshot_chunk_size: usize,
    pub snapshot_replication_threshold: Option<u64>,
    pub admin_request_timeout: Duration,
}

impl RaftOptionsValidated {
    fn validate(&self) -> Result<(), &'static str> {
        if self.leader_heartbeat_duration >= self.follower_min_timeout {
            return Err("Follower minimum timeout must be greater than leader's heartbeat");
        }
        if self.follower_min_timeout >= self.follower_max_timeout {
            return Err("Follower minimum timeout must be less than maximum timeout");
        }
        if self.leader_rpc_timeout >= self.follower_min_timeout {
            return Err("Leader's RPC timeout must be less than the follower's heartbeat timeout");
        }
        if self.leader_step_down_timeout <= self.follower_max_timeout {
            return Err("Leader step down timeout must be greater than follower's maximum timeout");
        }
        if self.max_entries_per_append == 0 {
            return Err("Max entries per append must be positive");
        }
        if self.snapshot_chunk_size == 0 {
            return Err("Snapshot chunk size must be positive");
        }
        if self.admin_request_timeout <= self.leader_rpc_timeout {
            return Err("Admin request timeout must be greater than leader's RPC timeout");
        }

        Ok(())
    }
}

impl TryFrom<RaftOptions> for RaftOptionsValidated {
    type Error = &'static str;

    fn try_from(options: RaftOptions) -> Result<Self, Self::Error> {
        let values = RaftOptionsValidated {
            leader_heartbeat_duration: options.leader_heartbeat_duration.unwrap_or(Duration::from_millis(100)),
            follower_min_timeout: options.follower_min_timeout.unwrap_or(Duration::from_millis(500)),
            follower_max_timeout: options.follower_max_timeout.unwrap_or(Duration::from_millis(1500)),
            leader_rpc_timeout: options.leader_rpc_timeout.unwrap_or(Duration::from_millis(300)),
            leader_step_down_timeout: options
                .leader_step_down_timeout
                .unwrap_or(Duration::from_millis(3000)),
            max_entries_per_append: options.max_entries_per_append.unwrap_or(64),
            snapshot_chunk_size: options.snapshot_chunk_size.unwrap_or(64 * 1024),
            snapshot_replication_threshold: options.snapshot_replication_threshold,
            admin_request_timeout: options.admin_request_timeout.unwrap_or(Duration::from_secs(10)),
        };

        values.validate()?;
        Ok(values)
    }
}
