// Transport des paquets : une connexion TCP courte par paquet, terminee par
// TERMINATOR, miroir du cadrage asynchat de l'implementation de reference.
// `ChannelTransport` relaie les memes paquets en memoire pour les tests.

use crate::error::{AppError, Result};
use crate::router::RouterHandle;
use crate::wire::{WirePacket, TERMINATOR};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

/// Emission d'un paquet vers un pair identifie par une adresse de destination.
/// La reception n'est pas part du trait : chaque implementation expose sa
/// propre boucle d'ecoute qui appelle `RouterHandle::deliver`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, dest: &str, packet: WirePacket) -> Result<()>;
}

/// Transport reel : une connexion TCP par paquet envoye, fermee aussitot apres.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, dest: &str, packet: WirePacket) -> Result<()> {
        let mut stream = TcpStream::connect(dest)
            .await
            .map_err(|e| AppError::NetworkError(format!("connect to {} failed: {}", dest, e)))?;
        let encoded = packet.encode()?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await.ok();
        Ok(())
    }
}

/// Accepte des connexions sur `bind_addr` indefiniment pour le compte de
/// l'interface `iface_name` : lit chaque connexion jusqu'au TERMINATOR,
/// decode le paquet et le remet au routeur avec l'identite de cette interface.
pub async fn serve_tcp(bind_addr: &str, iface_name: String, router: Arc<RouterHandle>) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::NetworkError(format!("bind {} failed: {}", bind_addr, e)))?;
    log::info!("listening for router packets on {} ({})", bind_addr, iface_name);
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("accept failed: {}", e);
                continue;
            }
        };
        let router = Arc::clone(&router);
        let iface_name = iface_name.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &iface_name, router).await {
                log::warn!("connection from {} failed: {}", peer, e);
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, iface_name: &str, router: Arc<RouterHandle>) -> Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 2048];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(AppError::NetworkError("connection closed before terminator".into()));
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_terminator(&buf) {
            let packet = WirePacket::decode(&buf[..pos])?;
            router.deliver(iface_name, packet).await;
            return Ok(());
        }
    }
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(TERMINATOR.len()).position(|w| w == TERMINATOR)
}

/// Relais en memoire utilise par les tests : chaque interface destinataire
/// s'enregistre sous la cle qu'utiliseront ses pairs (typiquement son
/// `peer_endpoint`), avec l'identite de l'interface qui la recoit cote
/// destinataire. `send` livre alors directement le paquet sans passer par
/// le reseau.
#[derive(Clone, Default)]
pub struct ChannelTransport {
    peers: Arc<Mutex<HashMap<String, (String, Arc<RouterHandle>)>>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, dest_key: impl Into<String>, iface_name: impl Into<String>, router: Arc<RouterHandle>) {
        self.peers.lock().await.insert(dest_key.into(), (iface_name.into(), router));
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, dest: &str, packet: WirePacket) -> Result<()> {
        let found = {
            let peers = self.peers.lock().await;
            peers.get(dest).cloned()
        };
        match found {
            Some((iface_name, router)) => {
                router.deliver(&iface_name, packet).await;
                Ok(())
            }
            None => Err(AppError::NetworkError(format!("no peer registered for {}", dest))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_terminator_locates_the_marker_past_json_bytes() {
        let mut buf = br#"{"kind":"Hello"}"#.to_vec();
        buf.extend_from_slice(&TERMINATOR);
        assert_eq!(find_terminator(&buf), Some(16));
    }

    #[test]
    fn find_terminator_is_none_on_partial_reads() {
        let buf = vec![0x00, b'E', 0x00];
        assert_eq!(find_terminator(&buf), None);
    }
}
