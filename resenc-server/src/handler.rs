//! TCP connection handler for the resenc server.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use resenc_core::{ResencError, ResencResult, ResourceRequest, ResourceResponse};

use crate::config::ServerConfig;
use crate::registry::ResourceRegistry;

/// resenc server.
pub struct Server {
    config: ServerConfig,
    registry: Arc<ResourceRegistry>,
}

impl Server {
    /// Create a new server.
    pub fn new(config: ServerConfig, registry: ResourceRegistry) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<ResourceRegistry> {
        Arc::clone(&self.registry)
    }

    /// Bind the configured address and run the server.
    pub async fn run(self) -> ResencResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| ResencError::Transport(format!("Failed to bind: {}", e)))?;

        self.serve(listener).await
    }

    /// Accept connections on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> ResencResult<()> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ResencError::Transport(format!("No local address: {}", e)))?;
        tracing::info!("resenc server listening on {}", local_addr);

        loop {
            let (stream, addr) = listener
                .accept()
                .await
                .map_err(|e| ResencError::Transport(format!("Accept failed: {}", e)))?;

            tracing::debug!("Connection from {}", addr);

            let registry = Arc::clone(&self.registry);
            let max_message_size = self.config.max_message_size;

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, max_message_size, registry).await {
                    tracing::error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

/// Serve requests on one connection until the peer disconnects.
async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    max_message_size: usize,
    registry: Arc<ResourceRegistry>,
) -> ResencResult<()> {
    let mut buf = [0u8; 4];

    loop {
        // Read length prefix (4 bytes, big-endian)
        match stream.read_exact(&mut buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::debug!("Client {} disconnected", addr);
                break;
            }
            Err(e) => return Err(ResencError::Transport(format!("Read error: {}", e))),
        }

        let len = u32::from_be_bytes(buf) as usize;

        if len > max_message_size {
            return Err(ResencError::Protocol(format!(
                "Message too large: {} > {}",
                len, max_message_size
            )));
        }

        let mut msg_buf = vec![0u8; len];
        stream
            .read_exact(&mut msg_buf)
            .await
            .map_err(|e| ResencError::Transport(format!("Read error: {}", e)))?;

        let request: ResourceRequest = serde_json::from_slice(&msg_buf)?;
        tracing::debug!(
            "Received {} {} ({})",
            request.method,
            request.uri,
            request.request_id
        );

        let response = registry.handle(&request);
        send_response(&mut stream, &response).await?;
    }

    Ok(())
}

/// Send a response message.
async fn send_response<S>(stream: &mut S, response: &ResourceResponse) -> ResencResult<()>
where
    S: AsyncWriteExt + Unpin,
{
    let json = serde_json::to_vec(response)?;
    let len = json.len() as u32;

    stream
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|e| ResencError::Transport(format!("Write error: {}", e)))?;

    stream
        .write_all(&json)
        .await
        .map_err(|e| ResencError::Transport(format!("Write error: {}", e)))?;

    stream
        .flush()
        .await
        .map_err(|e| ResencError::Transport(format!("Flush error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use resenc_core::{AttributeStore, NOT_FOUND_CODE};
    use crate::resource::ResourceObject;

    async fn exchange(stream: &mut TcpStream, request: &ResourceRequest) -> ResourceResponse {
        let json = serde_json::to_vec(request).unwrap();
        stream.write_all(&(json.len() as u32).to_be_bytes()).await.unwrap();
        stream.write_all(&json).await.unwrap();

        let mut len = [0u8; 4];
        stream.read_exact(&mut len).await.unwrap();
        let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
        stream.read_exact(&mut body).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn start(config: ServerConfig) -> SocketAddr {
        let mut registry = ResourceRegistry::new();
        registry.register(
            ResourceObject::builder("/a/light", "core.light", "oic.if.baseline")
                .set_attributes(AttributeStore::new().with("on-off", false))
                .build(),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(Server::new(config, registry).serve(listener));
        addr
    }

    #[tokio::test]
    async fn serves_framed_requests() {
        let addr = start(ServerConfig::default()).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let request = ResourceRequest::set("/a/light", AttributeStore::new().with("on-off", true));
        let response = exchange(&mut stream, &request).await;
        assert_eq!(response.in_response_to, request.request_id);
        assert!(response.attributes.get("on-off").unwrap().as_bool().unwrap());

        let request = ResourceRequest::get("/a/other");
        let response = exchange(&mut stream, &request).await;
        assert_eq!(response.error_code, NOT_FOUND_CODE);
    }

    #[tokio::test]
    async fn oversized_frame_closes_connection() {
        let addr = start(ServerConfig::default().with_max_message_size(8)).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(&1024u32.to_be_bytes()).await.unwrap();

        let mut buf = [0u8; 4];
        let read = stream.read(&mut buf).await.unwrap_or(0);
        assert_eq!(read, 0);
    }
}
