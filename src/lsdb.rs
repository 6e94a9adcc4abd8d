// Base de données d'état des liens : fusion, vieillissement et flush des LSA.

use crate::dijkstra;
use crate::types::{RouterId, AGE_TOLERANCE, MAX_AGE};
use crate::wire::LinkStatePacket;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct Lsdb {
    entries: BTreeMap<RouterId, LinkStatePacket>,
}

impl Lsdb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, router: &RouterId) -> Option<&LinkStatePacket> {
        self.entries.get(router)
    }

    pub fn contains(&self, router: &RouterId) -> bool {
        self.entries.contains_key(router)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RouterId, &LinkStatePacket)> {
        self.entries.iter()
    }

    /// Fusionne une LSA reçue ou originée localement.
    ///
    /// Accepte et écrase si aucune entrée n'existe pour `adv_router`, ou si le
    /// `seq_no` de la nouvelle LSA est strictement supérieur, ou si les `seq_no`
    /// sont égaux mais que le nouvel `age` est inférieur à l'ancien de plus
    /// d'`AGE_TOLERANCE`. Retourne `true` si la LSA a été acceptée.
    pub fn insert(&mut self, lsa: LinkStatePacket) -> bool {
        let accept = match self.entries.get(&lsa.adv_router) {
            None => true,
            Some(old) => {
                lsa.seq_no > old.seq_no
                    || (lsa.seq_no == old.seq_no
                        && (lsa.age as i64) < old.age as i64 - AGE_TOLERANCE as i64)
            }
        };
        if accept {
            self.entries.insert(lsa.adv_router.clone(), lsa);
        }
        accept
    }

    /// Vieillit chaque entrée d'`age_interval_secs`, flush et retourne celles qui ont atteint MaxAge.
    pub fn update(&mut self, age_interval_secs: u32) -> Vec<RouterId> {
        let mut flushed = Vec::new();
        self.entries.retain(|router, lsa| {
            lsa.age = lsa.age.saturating_add(age_interval_secs);
            if lsa.age >= MAX_AGE {
                flushed.push(router.clone());
                false
            } else {
                true
            }
        });
        flushed
    }

    /// Plus courts chemins depuis `source` au sens de Dijkstra sur le graphe dérivé des LSA.
    /// Inclut toujours `source` elle-même, associée à `(source, 0.0)`.
    pub fn get_shortest_paths(&self, source: &RouterId) -> BTreeMap<RouterId, (RouterId, f64)> {
        dijkstra::shortest_paths(self, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    fn lsa(router: &str, seq_no: u32, age: u32) -> LinkStatePacket {
        LinkStatePacket {
            adv_router: RouterId::new(router),
            seq_no,
            age,
            networks: Map::new(),
        }
    }

    #[test]
    fn insert_accepts_first_entry() {
        let mut db = Lsdb::new();
        assert!(db.insert(lsa("A", 1, 1)));
        assert!(db.contains(&RouterId::new("A")));
    }

    #[test]
    fn insert_rejects_lower_seq_no() {
        let mut db = Lsdb::new();
        assert!(db.insert(lsa("A", 5, 1)));
        assert!(!db.insert(lsa("A", 3, 1)));
        assert_eq!(db.get(&RouterId::new("A")).unwrap().seq_no, 5);
    }

    #[test]
    fn insert_accepts_higher_seq_no() {
        let mut db = Lsdb::new();
        db.insert(lsa("A", 1, 1));
        assert!(db.insert(lsa("A", 2, 1)));
        assert_eq!(db.get(&RouterId::new("A")).unwrap().seq_no, 2);
    }

    #[test]
    fn insert_accepts_same_seq_no_when_significantly_fresher() {
        let mut db = Lsdb::new();
        db.insert(lsa("A", 1, 100));
        assert!(db.insert(lsa("A", 1, 1)));
        assert_eq!(db.get(&RouterId::new("A")).unwrap().age, 1);
    }

    #[test]
    fn insert_rejects_same_seq_no_within_tolerance() {
        let mut db = Lsdb::new();
        db.insert(lsa("A", 1, 10));
        assert!(!db.insert(lsa("A", 1, 9)));
        assert_eq!(db.get(&RouterId::new("A")).unwrap().age, 10);
    }

    #[test]
    fn update_ages_and_flushes_max_age_entries() {
        let mut db = Lsdb::new();
        db.insert(lsa("A", 1, 1));
        db.insert(lsa("B", 1, MAX_AGE - 1));
        let flushed = db.update(1);
        assert_eq!(flushed, vec![RouterId::new("B")]);
        assert!(db.contains(&RouterId::new("A")));
        assert!(!db.contains(&RouterId::new("B")));
    }
}
