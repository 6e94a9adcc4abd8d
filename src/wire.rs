// Formats de message échangés entre routeurs : HelloPacket, LSA, et leur encodage sur le fil.

use crate::error::Result;
use crate::types::RouterId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

/// Marque la fin d'un paquet sur une connexion TCP courte.
pub const TERMINATOR: [u8; 6] = [0x00, b'E', 0x00, b'O', 0x00, b'F'];

/// Annonce la présence de l'émetteur sur un lien et rappelle les voisins récemment vus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelloPacket {
    pub router_id: RouterId,
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub seen: BTreeSet<RouterId>,
}

/// Un lien annoncé par une LSA : le voisin de l'autre côté, le coût, et l'adressage local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub peer: RouterId,
    pub cost: f64,
    pub local_address: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

/// Link-State Advertisement : les liens directs d'un routeur, vieillis et numérotés.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkStatePacket {
    pub adv_router: RouterId,
    pub seq_no: u32,
    pub age: u32,
    pub networks: BTreeMap<Ipv4Addr, LinkEntry>,
}

/// Enveloppe des deux types de paquets transportés sur le fil.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum WirePacket {
    Hello(HelloPacket),
    Lsa(LinkStatePacket),
}

impl WirePacket {
    /// `serialize(packet) || TERMINATOR`, prêt à être écrit sur une connexion.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = serde_json::to_vec(self)?;
        buf.extend_from_slice(&TERMINATOR);
        Ok(buf)
    }

    /// Désérialise le contenu précédant le terminateur (déjà tronqué par l'appelant).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

impl From<HelloPacket> for WirePacket {
    fn from(p: HelloPacket) -> Self {
        WirePacket::Hello(p)
    }
}

impl From<LinkStatePacket> for WirePacket {
    fn from(p: LinkStatePacket) -> Self {
        WirePacket::Lsa(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hello() -> HelloPacket {
        let mut seen = BTreeSet::new();
        seen.insert(RouterId::new("B"));
        seen.insert(RouterId::new("C"));
        HelloPacket {
            router_id: RouterId::new("A"),
            address: Ipv4Addr::new(10, 0, 0, 1),
            netmask: Ipv4Addr::new(255, 255, 255, 0),
            seen,
        }
    }

    fn sample_lsa() -> LinkStatePacket {
        let mut networks = BTreeMap::new();
        networks.insert(
            Ipv4Addr::new(10, 0, 0, 0),
            LinkEntry {
                peer: RouterId::new("B"),
                cost: 1.0,
                local_address: Ipv4Addr::new(10, 0, 0, 1),
                netmask: Ipv4Addr::new(255, 255, 255, 0),
            },
        );
        LinkStatePacket {
            adv_router: RouterId::new("A"),
            seq_no: 1,
            age: 1,
            networks,
        }
    }

    #[test]
    fn hello_round_trips_through_the_wire_format() {
        let packet: WirePacket = sample_hello().into();
        let encoded = packet.encode().unwrap();
        assert!(encoded.ends_with(&TERMINATOR));
        let decoded = WirePacket::decode(&encoded[..encoded.len() - TERMINATOR.len()]).unwrap();
        match decoded {
            WirePacket::Hello(p) => assert_eq!(p, sample_hello()),
            _ => panic!("expected Hello"),
        }
    }

    #[test]
    fn lsa_round_trips_through_the_wire_format() {
        let packet: WirePacket = sample_lsa().into();
        let encoded = packet.encode().unwrap();
        let decoded = WirePacket::decode(&encoded[..encoded.len() - TERMINATOR.len()]).unwrap();
        match decoded {
            WirePacket::Lsa(p) => assert_eq!(p, sample_lsa()),
            _ => panic!("expected Lsa"),
        }
    }

    #[test]
    fn malformed_payload_is_rejected_without_panicking() {
        assert!(WirePacket::decode(b"not json").is_err());
    }
}
