//! TCP connection for the resenc client.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use resenc_core::{ResencError, ResencResult, ResourceRequest, ResourceResponse};

/// Client connection configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// Server address.
    pub server_addr: SocketAddr,
    /// Max response size accepted.
    pub max_message_size: usize,
}

impl ConnectionConfig {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            max_message_size: 1024 * 1024,
        }
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

/// Connection to a resenc server.
pub struct Connection {
    stream: TcpStream,
    max_message_size: usize,
}

impl Connection {
    /// Connect to server.
    pub async fn connect(config: &ConnectionConfig) -> ResencResult<Self> {
        let stream = TcpStream::connect(config.server_addr)
            .await
            .map_err(|e| ResencError::Transport(format!("Connection failed: {}", e)))?;

        tracing::debug!("Connected to {}", config.server_addr);

        Ok(Self {
            stream,
            max_message_size: config.max_message_size,
        })
    }

    /// Send a request and receive its response.
    pub async fn send_request(
        &mut self,
        request: &ResourceRequest,
    ) -> ResencResult<ResourceResponse> {
        let json = serde_json::to_vec(request)?;
        let len = json.len() as u32;

        // Send length prefix + message
        self.stream
            .write_all(&len.to_be_bytes())
            .await
            .map_err(|e| ResencError::Transport(format!("Write error: {}", e)))?;
        self.stream
            .write_all(&json)
            .await
            .map_err(|e| ResencError::Transport(format!("Write error: {}", e)))?;
        self.stream
            .flush()
            .await
            .map_err(|e| ResencError::Transport(format!("Flush error: {}", e)))?;

        // Read response length
        let mut len_buf = [0u8; 4];
        self.stream
            .read_exact(&mut len_buf)
            .await
            .map_err(|e| ResencError::Transport(format!("Read error: {}", e)))?;
        let len = u32::from_be_bytes(len_buf) as usize;

        if len > self.max_message_size {
            return Err(ResencError::Protocol(format!(
                "Response too large: {} > {}",
                len, self.max_message_size
            )));
        }

        let mut msg_buf = vec![0u8; len];
        self.stream
            .read_exact(&mut msg_buf)
            .await
            .map_err(|e| ResencError::Transport(format!("Read error: {}", e)))?;

        let response: ResourceResponse = serde_json::from_slice(&msg_buf)?;

        if response.in_response_to != request.request_id {
            return Err(ResencError::Protocol(format!(
                "Response to {} while waiting for {}",
                response.in_response_to, request.request_id
            )));
        }

        Ok(response)
    }
}
