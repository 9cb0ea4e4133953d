//
// Link to the coordinator over its Unix socket.
//

use std::path::Path;

use thiserror::Error;
use tokio::net::UnixStream;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

use common::protocol::{Completion, ProtocolError, TaskReply};
use common::rpc::{coordinator_client::CoordinatorClient, DoneRequest, TaskRequest};

#[derive(Debug, Error)]
pub enum LinkError {
    /// The call did not go through, or the coordinator refused it.
    #[error("coordinator call failed: {0}")]
    Rpc(#[from] tonic::Status),

    /// The coordinator answered with something this worker cannot act on.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Where a worker gets its tasks from and reports them back to.
#[tonic::async_trait]
pub trait TaskSource: Send {
    async fn request_task(&mut self) -> Result<TaskReply, LinkError>;

    async fn notify_done(&mut self, completion: Completion) -> Result<(), LinkError>;
}

/// [`TaskSource`] backed by the coordinator's gRPC service.
#[derive(Debug, Clone)]
pub struct RpcLink {
    client: CoordinatorClient<Channel>,
}

impl RpcLink {
    pub async fn connect(socket: &Path) -> Result<Self, tonic::transport::Error> {
        let socket = socket.to_path_buf();

        // The URI is required by the endpoint but never dialled.
        let channel = Endpoint::from_static("http://[::]:50051")
            .connect_with_connector(service_fn(move |_: Uri| UnixStream::connect(socket.clone())))
            .await?;

        Ok(Self {
            client: CoordinatorClient::new(channel),
        })
    }
}

#[tonic::async_trait]
impl TaskSource for RpcLink {
    async fn request_task(&mut self) -> Result<TaskReply, LinkError> {
        let reply = self.client.request_task(TaskRequest {}).await?.into_inner();
        Ok(TaskReply::try_from(reply)?)
    }

    async fn notify_done(&mut self, completion: Completion) -> Result<(), LinkError> {
        self.client
            .notify_done(DoneRequest::from(completion))
            .await?;
        Ok(())
    }
}
