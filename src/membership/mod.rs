mod cluster;
mod configuration;
mod member;
mod quorum;

pub(crate) use cluster::ClusterMembership;
pub(crate) use cluster::LocalMembership;
pub(crate) use configuration::same_members;
pub(crate) use configuration::Configuration;
pub(crate) use member::MemberId;
pub(crate) use member::MemberType;
pub(crate) use member::RaftMember;
pub(crate) use quorum::JointQuorum;
