use atomix_raft::{
    EnqueueEntryError, EnqueueEntryInput, RaftClient, RaftClientConfig, RaftCommitEvent, RaftMemberInfo, RaftNetwork,
    RaftOptions,
};
use bytes::Bytes;
use slog::Drain;
use std::collections::HashMap;
use std::error::Error;
use std::net::SocketAddr;
use tokio::time::Duration;

// Runs a three member cluster on localhost and replicates a single entry through it.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let member_addrs: HashMap<String, SocketAddr> = (1..=3)
        .map(|i| (format!("member-{}", i), SocketAddr::from(([127, 0, 0, 1], 9000 + i as u16))))
        .collect();
    let bootstrap_members: Vec<RaftMemberInfo> = member_addrs.keys().map(RaftMemberInfo::active).collect();

    let mut clients = HashMap::new();
    for (member_id, listen_addr) in member_addrs.iter() {
        let client = atomix_raft::try_create_raft_client(RaftClientConfig {
            my_member_id: member_id.clone(),
            bootstrap_members: bootstrap_members.clone(),
            network: RaftNetwork::Grpc {
                listen_addr: *listen_addr,
                member_addrs: member_addrs.clone(),
            },
            info_logger: create_root_logger_for_stdout(member_id.clone()),
            options: RaftOptions::default(),
        })
        .await?;
        clients.insert(member_id.clone(), client);
    }

    let data = Bytes::from("Hello world");
    let mut target = "member-1".to_string();
    let output = loop {
        let result = clients[&target]
            .replicated_log
            .enqueue_entry(EnqueueEntryInput { data: data.clone() })
            .await;
        match result {
            Ok(output) => break output,
            Err(EnqueueEntryError::LeaderRedirect(leader)) => target = leader.member_id,
            Err(EnqueueEntryError::NoLeader) => tokio::time::sleep(Duration::from_millis(200)).await,
            Err(e) => return Err(e.into()),
        }
    };
    println!("Enqueued {:?} on {}", output.entry_id, target);

    for (member_id, client) in clients.iter_mut() {
        wait_for_commit(member_id, client).await;
    }

    Ok(())
}

async fn wait_for_commit(member_id: &str, client: &mut RaftClient) {
    while let Some(event) = client.commit_stream.next().await {
        if let RaftCommitEvent::Entry(entry) = event {
            println!("{} committed {:?}: {:?}", member_id, entry.entry_id, entry.data);
            return;
        }
    }
}

fn create_root_logger_for_stdout(member_id: String) -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!("MemberId" => member_id))
}
