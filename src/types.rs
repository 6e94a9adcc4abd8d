// Identifiants de routeur et constantes du protocole

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Identifiant opaque d'un routeur, unique dans tout le domaine routé.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouterId(pub String);

impl RouterId {
    pub fn new(id: impl Into<String>) -> Self {
        RouterId(id.into())
    }
}

impl fmt::Display for RouterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RouterId {
    fn from(s: &str) -> Self {
        RouterId(s.to_string())
    }
}

impl From<String> for RouterId {
    fn from(s: String) -> Self {
        RouterId(s)
    }
}

/// Adresse réseau d'une interface : ET bit à bit de l'adresse et du masque.
pub fn network_address(addr: Ipv4Addr, netmask: Ipv4Addr) -> Ipv4Addr {
    let a = addr.octets();
    let m = netmask.octets();
    Ipv4Addr::new(a[0] & m[0], a[1] & m[1], a[2] & m[2], a[3] & m[3])
}

/// Émission périodique des Hello pour établir/maintenir l'adjacence.
pub const HELLO_INTERVAL: Duration = Duration::from_secs(10);
/// Absence de Hello au-delà de ce délai : le voisin est déclaré down (4x HELLO_INTERVAL par convention).
pub const DEAD_INTERVAL: Duration = Duration::from_secs(40);
/// Cadence du tic de vieillissement de la LSDB.
pub const AGE_INTERVAL: Duration = Duration::from_secs(1);
/// Nombre de secondes représenté par un tic d'AGE_INTERVAL, utilisé par Lsdb::update.
pub const AGE_INTERVAL_SECS: u32 = AGE_INTERVAL.as_secs() as u32;
/// Période de réorigination de notre propre LSA pour éviter qu'elle n'atteigne MaxAge ailleurs.
pub const LS_REFRESH_TIME: Duration = Duration::from_secs(1800);
/// Âge à partir duquel une LSA est éligible au flush.
pub const MAX_AGE: u32 = 3600;
/// Numérateur de la formule de coût : cost = BANDWIDTH_BASE / bandwidth_bps.
pub const BANDWIDTH_BASE: f64 = 1e8;
/// Première valeur de seq_no attribuée à une LSA nouvellement originée.
pub const INITIAL_SEQUENCE_NUMBER: u32 = 1;
/// Marge de vieillissement en dessous de laquelle une LSA de même seq_no n'est pas considérée plus fraîche.
pub const AGE_TOLERANCE: u32 = 5;
/// Tolérance utilisée pour comparer deux coûts flottants (évite les effets de plate-forme sur la division).
pub const COST_EPSILON: f64 = 1e-6;

/// Coût d'un lien, dérivé de `BANDWIDTH_BASE / bandwidth_bps`.
pub fn link_cost(bandwidth_bps: f64) -> f64 {
    BANDWIDTH_BASE / bandwidth_bps
}

pub fn cost_approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < COST_EPSILON
}
