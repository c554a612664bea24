use crate::commitlog::{Index, Log};
use crate::membership::{LocalMembership, MemberId, MemberType};
use crate::protocol::{PollRequest, PollResponse, RaftError, RaftRequest, RaftResult, VoteRequest, VoteResponse};
use crate::replica::local_state::Term;
use crate::replica::peer_call::ReplyRoute;
use crate::replica::replica::Replica;
use crate::replica::replica_api::{ElectionReplyFromPeer, ElectionRequestKind, PeerReplyError};
use crate::replica::write_ahead_log::{EntryPayload, WriteAheadLogEntry};
use std::collections::HashSet;

impl<L> Replica<L>
where
    L: Log<WriteAheadLogEntry> + 'static,
{
    pub(super) fn handle_poll(&mut self, request: PollRequest) -> RaftResult<PollResponse> {
        self.ensure_voting_member()?;

        // Poll never changes local state, not even the term.
        let current_term = self.current_term();

        // A leader is still around, so there's nothing to poll for. The poller evidently reaches
        // us again, so stop backing off from it.
        if let Some(leader_state) = self.election_state.leader_state_mut() {
            if let Some(peer_state) = leader_state.peer_state_mut(&request.candidate) {
                peer_state.reset_failures();
            }
            slog::info!(self.logger, "Rejecting Poll from {:?}. We're leader.", request.candidate);
            return Ok(PollResponse {
                term: current_term,
                accepted: false,
            });
        }

        let accepted = self.should_accept_candidate("Poll", request.term, &request.candidate, request.last_log_entry);

        Ok(PollResponse {
            term: current_term,
            accepted,
        })
    }

    pub(super) fn handle_vote(&mut self, request: VoteRequest) -> RaftResult<VoteResponse> {
        self.ensure_voting_member()?;

        // 1. Reply false if term < currentTerm (§5.1)
        if request.term < self.current_term() {
            return Ok(VoteResponse {
                term: self.current_term(),
                accepted: false,
            });
        }

        self.observe_term(request.term, None);
        let current_term = self.current_term();

        // 2. If votedFor is null or candidateId, and candidate’s log is at
        // least as up-to-date as receiver’s log, grant vote (§5.2, §5.4).
        if !self.should_accept_candidate("Vote", request.term, &request.candidate, request.last_log_entry) {
            return Ok(VoteResponse {
                term: current_term,
                accepted: false,
            });
        }

        // If votedFor is null or candidateId...
        let (_, opt_voted_for) = self.local_state.voted_for_current_term();
        let accepted = match opt_voted_for {
            Some(voted_for) => *voted_for == request.candidate,
            None => self
                .local_state
                .store_vote_for_term_if_unvoted(current_term, request.candidate.clone()),
        };

        if accepted {
            slog::info!(self.logger, "Voting for {:?} in term {:?}", request.candidate, current_term);
            // Granting a vote counts as hearing from a legitimate candidate.
            self.election_state.reset_timeout_if_follower();
        } else {
            slog::info!(self.logger, "Not voting for {:?}. Already voted this term.", request.candidate);
        }

        Ok(VoteResponse {
            term: current_term,
            accepted,
        })
    }

    fn ensure_voting_member(&self) -> RaftResult<()> {
        match self.membership.local_membership() {
            LocalMembership::Member(MemberType::Active) => Ok(()),
            other => Err(RaftError::illegal_member_state(format!(
                "Cannot take part in elections as {:?}",
                other
            ))),
        }
    }

    fn should_accept_candidate(
        &self,
        request_kind: &str,
        request_term: Term,
        candidate: &MemberId,
        candidate_last_entry: Option<(Term, Index)>,
    ) -> bool {
        if request_term < self.current_term() {
            slog::info!(self.logger, "Rejecting {} from {:?}. Term is out of date.", request_kind, candidate);
            return false;
        }
        if !self.membership.quorum().is_voter(candidate) {
            slog::info!(self.logger, "Rejecting {} from {:?}. Not a voter.", request_kind, candidate);
            return false;
        }
        if !self.is_candidate_log_gte_mine(candidate_last_entry) {
            slog::info!(self.logger, "Rejecting {} from {:?}. Log is out of date.", request_kind, candidate);
            return false;
        }

        true
    }

    fn is_candidate_log_gte_mine(&self, candidate_last_entry: Option<(Term, Index)>) -> bool {
        // > Raft determines which of two logs is more up-to-date
        // > by comparing the index and term of the last entries in the
        // > logs. If the logs have last entries with different terms, then
        // > the log with the later term is more up-to-date. If the logs
        // > end with the same term, then whichever log is longer is
        // > more up-to-date.
        match (self.wal.latest_entry(), candidate_last_entry) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some((my_term, my_index)), Some((candidate_term, candidate_index))) => {
                (candidate_term, candidate_index) >= (my_term, my_index)
            }
        }
    }

    pub(crate) fn handle_follower_timeout(&mut self, term: Term) {
        let current_term = self.current_term();
        if term != current_term {
            slog::debug!(self.logger, "Ignoring timeout armed in term {:?}", term);
            return;
        }

        if self.election_state.is_candidate() {
            slog::info!(self.logger, "Election for term {:?} timed out. Restarting.", term);
            self.start_election();
        } else if self.election_state.start_poll_round_if_follower(current_term) {
            slog::info!(self.logger, "Timed out as follower. Polling for term {:?}.", current_term);
            self.on_poll_accepted(current_term, self.my_member_id.clone());
            if self.election_state.is_follower() {
                self.send_election_requests(ElectionRequestKind::Poll, current_term);
            }
        }
    }

    pub(crate) fn handle_election_reply_from_peer(&mut self, reply: ElectionReplyFromPeer) {
        let response = match reply.result {
            Ok(response) => response,
            Err(PeerReplyError::Error(e)) => {
                if let Some(term) = e.term {
                    self.observe_term(term, None);
                }
                slog::info!(self.logger, "{:?} to {:?} failed: {}", reply.kind, reply.peer_id, e);
                return;
            }
            Err(PeerReplyError::Failed(message)) => {
                slog::debug!(self.logger, "{:?} to {:?} failed: {}", reply.kind, reply.peer_id, message);
                return;
            }
        };

        if self.observe_term(response.term, None) {
            return;
        }
        if !response.accepted {
            slog::info!(
                self.logger,
                "{:?} for term {:?} rejected by {:?}",
                reply.kind,
                reply.term,
                reply.peer_id
            );
            return;
        }

        match reply.kind {
            ElectionRequestKind::Poll => self.on_poll_accepted(reply.term, reply.peer_id),
            ElectionRequestKind::Vote => {
                if reply.term != self.current_term() {
                    slog::info!(self.logger, "Received vote for outdated term {:?}", reply.term);
                    return;
                }
                let votes = match self.election_state.add_vote_if_candidate(reply.peer_id) {
                    Some(votes) => votes,
                    None => {
                        slog::info!(
                            self.logger,
                            "Received vote for term {:?} after transitioning to a election state: {:?}",
                            reply.term,
                            self.election_state,
                        );
                        return;
                    }
                };
                self.become_leader_if_elected(&votes);
            }
        }
    }

    fn on_poll_accepted(&mut self, term: Term, from: MemberId) {
        let accepted_from = match self.election_state.add_poll_accept_if_polling(term, from) {
            Some(accepted_from) => accepted_from,
            None => return,
        };

        if self.membership.quorum().has_majority(&accepted_from) {
            slog::info!(self.logger, "Poll for term {:?} accepted by {:?}", term, accepted_from);
            self.start_election();
        }
    }

    fn start_election(&mut self) {
        // Write-ahead log style: Vote for self on local state before transitioning to candidate.
        let new_term = self.local_state.increment_term_and_vote_for_self();
        self.election_state.transition_to_candidate_and_vote_for_self(new_term);
        slog::info!(
            self.logger,
            "Changed to candidate. Election state: {:?}",
            self.election_state,
        );

        let mut votes = HashSet::new();
        votes.insert(self.my_member_id.clone());
        if !self.become_leader_if_elected(&votes) {
            self.send_election_requests(ElectionRequestKind::Vote, new_term);
        }
    }

    fn send_election_requests(&self, kind: ElectionRequestKind, term: Term) {
        let quorum = self.membership.quorum();
        let last_log_entry = self.wal.latest_entry();
        for peer_id in self.membership.remote_member_ids() {
            if !quorum.is_voter(&peer_id) {
                continue;
            }

            let request = match kind {
                ElectionRequestKind::Poll => RaftRequest::Poll(PollRequest {
                    term,
                    candidate: self.my_member_id.clone(),
                    last_log_entry,
                }),
                ElectionRequestKind::Vote => RaftRequest::Vote(VoteRequest {
                    term,
                    candidate: self.my_member_id.clone(),
                    last_log_entry,
                }),
            };
            self.peers
                .spawn_call(peer_id, request, ReplyRoute::Election { kind, term });
        }
    }

    /// Returns true if we're leader now.
    fn become_leader_if_elected(&mut self, votes: &HashSet<MemberId>) -> bool {
        if !self.membership.quorum().has_majority(votes) {
            return false;
        }

        let term = self.current_term();
        let initial_entry_index = match self.wal.append(WriteAheadLogEntry {
            term,
            payload: EntryPayload::Initialize,
        }) {
            Ok(index) => index,
            Err(e) => {
                slog::error!(self.logger, "Won election but failed to append initial entry: {:?}", e);
                self.step_down(term, None);
                return false;
            }
        };

        self.election_state
            .transition_to_leader(term, self.membership.remote_member_ids(), initial_entry_index);
        slog::info!(
            self.logger,
            "Won election with votes from {:?}. Election state: {:?}",
            votes,
            self.election_state
        );

        // A single voter commits on its own.
        self.advance_leader_commit();
        true
    }
}
