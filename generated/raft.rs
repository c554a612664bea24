#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoMember {
    #[prost(string, tag = "1")]
    pub member_id: ::prost::alloc::string::String,
    #[prost(enumeration = "ProtoMemberType", tag = "2")]
    pub member_type: i32,
}
/// Present on a response iff its status is ERROR.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoRaftError {
    #[prost(enumeration = "ProtoErrorKind", tag = "1")]
    pub kind: i32,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
    /// Responder's term when the request was rejected for a stale term. 0 otherwise.
    #[prost(uint64, tag = "3")]
    pub term: u64,
}
/// Stored as the payload of configuration log entries as well as sent over the wire.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoConfiguration {
    #[prost(uint64, tag = "1")]
    pub index: u64,
    #[prost(uint64, tag = "2")]
    pub term: u64,
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
    #[prost(message, repeated, tag = "4")]
    pub new_members: ::prost::alloc::vec::Vec<ProtoMember>,
    #[prost(message, repeated, tag = "5")]
    pub old_members: ::prost::alloc::vec::Vec<ProtoMember>,
    #[prost(uint64, tag = "6")]
    pub compaction_bound: u64,
    #[prost(bool, tag = "7")]
    pub force: bool,
}
// ------- Election -------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoPollRequest {
    #[prost(uint64, tag = "1")]
    pub term: u64,
    #[prost(string, tag = "2")]
    pub candidate: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub last_log_index: u64,
    #[prost(uint64, tag = "4")]
    pub last_log_term: u64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoPollResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoRaftError>,
    #[prost(uint64, tag = "2")]
    pub term: u64,
    #[prost(bool, tag = "3")]
    pub accepted: bool,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoVoteRequest {
    #[prost(uint64, tag = "1")]
    pub term: u64,
    #[prost(string, tag = "2")]
    pub candidate: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub last_log_index: u64,
    #[prost(uint64, tag = "4")]
    pub last_log_term: u64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoVoteResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoRaftError>,
    #[prost(uint64, tag = "2")]
    pub term: u64,
    #[prost(bool, tag = "3")]
    pub accepted: bool,
}
// ------- Replication -------

/// Legacy record format. Has no protocol version.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoPersistedRecord {
    #[prost(uint64, tag = "1")]
    pub index: u64,
    #[prost(uint64, tag = "2")]
    pub term: u64,
    #[prost(uint32, tag = "3")]
    pub checksum: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoAppendRequest {
    #[prost(uint64, tag = "1")]
    pub term: u64,
    #[prost(string, tag = "2")]
    pub leader: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub prev_log_index: u64,
    #[prost(uint64, tag = "4")]
    pub prev_log_term: u64,
    #[prost(uint64, tag = "5")]
    pub commit_index: u64,
    #[prost(message, repeated, tag = "6")]
    pub entries: ::prost::alloc::vec::Vec<ProtoPersistedRecord>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoReplicatableRecord {
    #[prost(uint64, tag = "1")]
    pub index: u64,
    #[prost(uint64, tag = "2")]
    pub term: u64,
    #[prost(uint32, tag = "3")]
    pub checksum: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub serialized: ::prost::alloc::vec::Vec<u8>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoVersionedAppendRequest {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(uint64, tag = "2")]
    pub term: u64,
    #[prost(string, tag = "3")]
    pub leader: ::prost::alloc::string::String,
    #[prost(uint64, tag = "4")]
    pub prev_log_index: u64,
    #[prost(uint64, tag = "5")]
    pub prev_log_term: u64,
    #[prost(uint64, tag = "6")]
    pub commit_index: u64,
    #[prost(message, repeated, tag = "7")]
    pub entries: ::prost::alloc::vec::Vec<ProtoReplicatableRecord>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoAppendResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoRaftError>,
    #[prost(uint64, tag = "2")]
    pub term: u64,
    #[prost(bool, tag = "3")]
    pub succeeded: bool,
    #[prost(uint64, tag = "4")]
    pub last_log_index: u64,
    #[prost(uint64, tag = "5")]
    pub last_snapshot_index: u64,
    #[prost(uint64, tag = "6")]
    pub configuration_index: u64,
}
// ------- Snapshots -------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoChunkId {
    #[prost(uint64, tag = "1")]
    pub offset: u64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoInstallRequest {
    #[prost(uint64, tag = "1")]
    pub current_term: u64,
    #[prost(string, tag = "2")]
    pub leader: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub index: u64,
    #[prost(uint64, tag = "4")]
    pub term: u64,
    #[prost(uint32, tag = "5")]
    pub version: u32,
    #[prost(message, optional, tag = "6")]
    pub chunk_id: ::core::option::Option<ProtoChunkId>,
    #[prost(message, optional, tag = "7")]
    pub next_chunk_id: ::core::option::Option<ProtoChunkId>,
    #[prost(bytes = "vec", tag = "8")]
    pub data: ::prost::alloc::vec::Vec<u8>,
    #[prost(bool, tag = "9")]
    pub initial: bool,
    #[prost(bool, tag = "10")]
    pub complete: bool,
    #[prost(uint32, tag = "11")]
    pub checksum: u32,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoInstallResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoRaftError>,
    #[prost(uint64, tag = "2")]
    pub preferred_chunk_size: u64,
}
// ------- Membership -------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoConfigureRequest {
    #[prost(uint64, tag = "1")]
    pub term: u64,
    #[prost(string, tag = "2")]
    pub leader: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub configuration: ::core::option::Option<ProtoConfiguration>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoConfigureResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoRaftError>,
    #[prost(uint64, tag = "2")]
    pub term: u64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoReconfigureRequest {
    #[prost(uint64, tag = "1")]
    pub index: u64,
    #[prost(uint64, tag = "2")]
    pub term: u64,
    #[prost(message, repeated, tag = "3")]
    pub members: ::prost::alloc::vec::Vec<ProtoMember>,
    #[prost(string, tag = "4")]
    pub from: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoReconfigureResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoRaftError>,
    #[prost(uint64, tag = "2")]
    pub index: u64,
    #[prost(uint64, tag = "3")]
    pub term: u64,
    #[prost(int64, tag = "4")]
    pub timestamp: i64,
    #[prost(message, repeated, tag = "5")]
    pub members: ::prost::alloc::vec::Vec<ProtoMember>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoForceConfigureRequest {
    #[prost(uint64, tag = "1")]
    pub term: u64,
    #[prost(uint64, tag = "2")]
    pub index: u64,
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
    #[prost(message, repeated, tag = "4")]
    pub new_members: ::prost::alloc::vec::Vec<ProtoMember>,
    #[prost(string, tag = "5")]
    pub from: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoForceConfigureResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoRaftError>,
    #[prost(uint64, tag = "2")]
    pub index: u64,
    #[prost(uint64, tag = "3")]
    pub term: u64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoJoinRequest {
    #[prost(message, optional, tag = "1")]
    pub joining_member: ::core::option::Option<ProtoMember>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoJoinResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoRaftError>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoLeaveRequest {
    #[prost(message, optional, tag = "1")]
    pub leaving_member: ::core::option::Option<ProtoMember>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoLeaveResponse {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoRaftError>,
}
// ------- Common -------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProtoMemberType {
    Active = 0,
    Promotable = 1,
    Passive = 2,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProtoErrorKind {
    Unknown = 0,
    NoLeader = 1,
    IllegalMemberState = 2,
    ConfigurationError = 3,
    ProtocolError = 4,
    ApplicationError = 5,
}
#[doc = r" Generated client implementations."]
pub mod grpc_raft_client {
    #![allow(unused_variables, dead_code, missing_docs)]
    use tonic::codegen::*;
    pub struct GrpcRaftClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl GrpcRaftClient<tonic::transport::Channel> {
        #[doc = r" Attempt to create a new client by connecting to a given endpoint."]
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: std::convert::TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> GrpcRaftClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::ResponseBody: Body + HttpBody + Send + 'static,
        T::Error: Into<StdError>,
        <T::ResponseBody as HttpBody>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub fn with_interceptor(inner: T, interceptor: impl Into<tonic::Interceptor>) -> Self {
            let inner = tonic::client::Grpc::with_interceptor(inner, interceptor);
            Self { inner }
        }
        pub async fn poll(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoPollRequest>,
        ) -> Result<tonic::Response<super::ProtoPollResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/raft.GrpcRaft/Poll");
            self.inner.unary(request.into_request(), path, codec).await
        }
        pub async fn vote(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoVoteRequest>,
        ) -> Result<tonic::Response<super::ProtoVoteResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/raft.GrpcRaft/Vote");
            self.inner.unary(request.into_request(), path, codec).await
        }
        pub async fn append(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoAppendRequest>,
        ) -> Result<tonic::Response<super::ProtoAppendResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/raft.GrpcRaft/Append");
            self.inner.unary(request.into_request(), path, codec).await
        }
        pub async fn versioned_append(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoVersionedAppendRequest>,
        ) -> Result<tonic::Response<super::ProtoAppendResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/raft.GrpcRaft/VersionedAppend");
            self.inner.unary(request.into_request(), path, codec).await
        }
        pub async fn install(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoInstallRequest>,
        ) -> Result<tonic::Response<super::ProtoInstallResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/raft.GrpcRaft/Install");
            self.inner.unary(request.into_request(), path, codec).await
        }
        pub async fn configure(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoConfigureRequest>,
        ) -> Result<tonic::Response<super::ProtoConfigureResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/raft.GrpcRaft/Configure");
            self.inner.unary(request.into_request(), path, codec).await
        }
        pub async fn reconfigure(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoReconfigureRequest>,
        ) -> Result<tonic::Response<super::ProtoReconfigureResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/raft.GrpcRaft/Reconfigure");
            self.inner.unary(request.into_request(), path, codec).await
        }
        pub async fn force_configure(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoForceConfigureRequest>,
        ) -> Result<tonic::Response<super::ProtoForceConfigureResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/raft.GrpcRaft/ForceConfigure");
            self.inner.unary(request.into_request(), path, codec).await
        }
        pub async fn join(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoJoinRequest>,
        ) -> Result<tonic::Response<super::ProtoJoinResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/raft.GrpcRaft/Join");
            self.inner.unary(request.into_request(), path, codec).await
        }
        pub async fn leave(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoLeaveRequest>,
        ) -> Result<tonic::Response<super::ProtoLeaveResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/raft.GrpcRaft/Leave");
            self.inner.unary(request.into_request(), path, codec).await
        }
    }
    impl<T: Clone> Clone for GrpcRaftClient<T> {
        fn clone(&self) -> Self {
            Self {
                inner: self.inner.clone(),
            }
        }
    }
    impl<T> std::fmt::Debug for GrpcRaftClient<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "GrpcRaftClient {{ ... }}")
        }
    }
}
#[doc = r" Generated server implementations."]
pub mod grpc_raft_server {
    #![allow(unused_variables, dead_code, missing_docs)]
    use tonic::codegen::*;
    #[doc = "Generated trait containing gRPC methods that should be implemented for use with GrpcRaftServer."]
    #[async_trait]
    pub trait GrpcRaft: Send + Sync + 'static {
        async fn poll(
            &self,
            request: tonic::Request<super::ProtoPollRequest>,
        ) -> Result<tonic::Response<super::ProtoPollResponse>, tonic::Status>;
        async fn vote(
            &self,
            request: tonic::Request<super::ProtoVoteRequest>,
        ) -> Result<tonic::Response<super::ProtoVoteResponse>, tonic::Status>;
        async fn append(
            &self,
            request: tonic::Request<super::ProtoAppendRequest>,
        ) -> Result<tonic::Response<super::ProtoAppendResponse>, tonic::Status>;
        async fn versioned_append(
            &self,
            request: tonic::Request<super::ProtoVersionedAppendRequest>,
        ) -> Result<tonic::Response<super::ProtoAppendResponse>, tonic::Status>;
        async fn install(
            &self,
            request: tonic::Request<super::ProtoInstallRequest>,
        ) -> Result<tonic::Response<super::ProtoInstallResponse>, tonic::Status>;
        async fn configure(
            &self,
            request: tonic::Request<super::ProtoConfigureRequest>,
        ) -> Result<tonic::Response<super::ProtoConfigureResponse>, tonic::Status>;
        async fn reconfigure(
            &self,
            request: tonic::Request<super::ProtoReconfigureRequest>,
        ) -> Result<tonic::Response<super::ProtoReconfigureResponse>, tonic::Status>;
        async fn force_configure(
            &self,
            request: tonic::Request<super::ProtoForceConfigureRequest>,
        ) -> Result<tonic::Response<super::ProtoForceConfigureResponse>, tonic::Status>;
        async fn join(
            &self,
            request: tonic::Request<super::ProtoJoinRequest>,
        ) -> Result<tonic::Response<super::ProtoJoinResponse>, tonic::Status>;
        async fn leave(
            &self,
            request: tonic::Request<super::ProtoLeaveRequest>,
        ) -> Result<tonic::Response<super::ProtoLeaveResponse>, tonic::Status>;
    }
    #[derive(Debug)]
    pub struct GrpcRaftServer<T: GrpcRaft> {
        inner: _Inner<T>,
    }
    struct _Inner<T>(Arc<T>, Option<tonic::Interceptor>);
    impl<T: GrpcRaft> GrpcRaftServer<T> {
        pub fn new(inner: T) -> Self {
            let inner = Arc::new(inner);
            let inner = _Inner(inner, None);
            Self { inner }
        }
        pub fn with_interceptor(inner: T, interceptor: impl Into<tonic::Interceptor>) -> Self {
            let inner = Arc::new(inner);
            let inner = _Inner(inner, Some(interceptor.into()));
            Self { inner }
        }
    }
    impl<T, B> Service<http::Request<B>> for GrpcRaftServer<T>
    where
        T: GrpcRaft,
        B: HttpBody + Send + Sync + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = Never;
        type Future = BoxFuture<Self::Response, Self::Error>;
        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            let inner = self.inner.clone();
            match req.uri().path() {
                "/raft.GrpcRaft/Poll" => {
                    #[allow(non_camel_case_types)]
                    struct PollSvc<T: GrpcRaft>(pub Arc<T>);
                    impl<T: GrpcRaft> tonic::server::UnaryService<super::ProtoPollRequest> for PollSvc<T> {
                        type Response = super::ProtoPollResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoPollRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).poll(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = PollSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/raft.GrpcRaft/Vote" => {
                    #[allow(non_camel_case_types)]
                    struct VoteSvc<T: GrpcRaft>(pub Arc<T>);
                    impl<T: GrpcRaft> tonic::server::UnaryService<super::ProtoVoteRequest> for VoteSvc<T> {
                        type Response = super::ProtoVoteResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoVoteRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).vote(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = VoteSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/raft.GrpcRaft/Append" => {
                    #[allow(non_camel_case_types)]
                    struct AppendSvc<T: GrpcRaft>(pub Arc<T>);
                    impl<T: GrpcRaft> tonic::server::UnaryService<super::ProtoAppendRequest> for AppendSvc<T> {
                        type Response = super::ProtoAppendResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoAppendRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).append(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = AppendSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/raft.GrpcRaft/VersionedAppend" => {
                    #[allow(non_camel_case_types)]
                    struct VersionedAppendSvc<T: GrpcRaft>(pub Arc<T>);
                    impl<T: GrpcRaft>
                        tonic::server::UnaryService<super::ProtoVersionedAppendRequest>
                        for VersionedAppendSvc<T>
                    {
                        type Response = super::ProtoAppendResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoVersionedAppendRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).versioned_append(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = VersionedAppendSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/raft.GrpcRaft/Install" => {
                    #[allow(non_camel_case_types)]
                    struct InstallSvc<T: GrpcRaft>(pub Arc<T>);
                    impl<T: GrpcRaft> tonic::server::UnaryService<super::ProtoInstallRequest> for InstallSvc<T> {
                        type Response = super::ProtoInstallResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoInstallRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).install(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = InstallSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/raft.GrpcRaft/Configure" => {
                    #[allow(non_camel_case_types)]
                    struct ConfigureSvc<T: GrpcRaft>(pub Arc<T>);
                    impl<T: GrpcRaft> tonic::server::UnaryService<super::ProtoConfigureRequest> for ConfigureSvc<T> {
                        type Response = super::ProtoConfigureResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoConfigureRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).configure(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = ConfigureSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/raft.GrpcRaft/Reconfigure" => {
                    #[allow(non_camel_case_types)]
                    struct ReconfigureSvc<T: GrpcRaft>(pub Arc<T>);
                    impl<T: GrpcRaft> tonic::server::UnaryService<super::ProtoReconfigureRequest>
                        for ReconfigureSvc<T>
                    {
                        type Response = super::ProtoReconfigureResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoReconfigureRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).reconfigure(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = ReconfigureSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/raft.GrpcRaft/ForceConfigure" => {
                    #[allow(non_camel_case_types)]
                    struct ForceConfigureSvc<T: GrpcRaft>(pub Arc<T>);
                    impl<T: GrpcRaft> tonic::server::UnaryService<super::ProtoForceConfigureRequest>
                        for ForceConfigureSvc<T>
                    {
                        type Response = super::ProtoForceConfigureResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoForceConfigureRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).force_configure(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = ForceConfigureSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/raft.GrpcRaft/Join" => {
                    #[allow(non_camel_case_types)]
                    struct JoinSvc<T: GrpcRaft>(pub Arc<T>);
                    impl<T: GrpcRaft> tonic::server::UnaryService<super::ProtoJoinRequest> for JoinSvc<T> {
                        type Response = super::ProtoJoinResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoJoinRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).join(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = JoinSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/raft.GrpcRaft/Leave" => {
                    #[allow(non_camel_case_types)]
                    struct LeaveSvc<T: GrpcRaft>(pub Arc<T>);
                    impl<T: GrpcRaft> tonic::server::UnaryService<super::ProtoLeaveRequest> for LeaveSvc<T> {
                        type Response = super::ProtoLeaveResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoLeaveRequest>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).leave(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = LeaveSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                _ => Box::pin(async move {
                    Ok(http::Response::builder()
                        .status(200)
                        .header("grpc-status", "12")
                        .header("content-type", "application/grpc")
                        .body(tonic::body::BoxBody::empty())
                        .unwrap())
                }),
            }
        }
    }
    impl<T: GrpcRaft> Clone for GrpcRaftServer<T> {
        fn clone(&self) -> Self {
            let inner = self.inner.clone();
            Self { inner }
        }
    }
    impl<T: GrpcRaft> Clone for _Inner<T> {
        fn clone(&self) -> Self {
            Self(self.0.clone(), self.1.clone())
        }
    }
    impl<T: std::fmt::Debug> std::fmt::Debug for _Inner<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }
    impl<T: GrpcRaft> tonic::transport::NamedService for GrpcRaftServer<T> {
        const NAME: &'static str = "raft.GrpcRaft";
    }
}
