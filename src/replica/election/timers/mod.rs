mod follower_timer;
mod leader_timer;
mod shared_deadline;
mod time;

#[cfg(test)]
mod test_utils;

pub(crate) use follower_timer::FollowerTimerHandle;
pub(crate) use leader_timer::LeaderTimerHandle;
