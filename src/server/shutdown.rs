use tokio::sync::oneshot;

/// The gRPC server runs until its handle, owned by the `RaftClient`, is dropped.
pub(crate) fn shutdown_signal() -> (RpcServerShutdownHandle, RpcServerShutdownSignal) {
    let (tx, rx) = oneshot::channel();

    (RpcServerShutdownHandle { _tx: tx }, RpcServerShutdownSignal { rx })
}

pub(crate) struct RpcServerShutdownHandle {
    _tx: oneshot::Sender<()>,
}

pub(crate) struct RpcServerShutdownSignal {
    rx: oneshot::Receiver<()>,
}

impl RpcServerShutdownSignal {
    pub(crate) async fn wait(self) {
        // Nothing is ever sent. Dropping the sender is the signal.
        let _ = self.rx.await;
    }
}
