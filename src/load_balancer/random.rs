//! Random-among-healthy read selection.

use std::sync::Arc;
use rand::Rng;
use crate::load_balancer::LoadBalancer;
use crate::replication::Node;

/// Picks uniformly among online readers.
/// Keeps no rotation state, so concurrent callers never contend on it.
#[derive(Debug, Default)]
pub struct RandomHealthy;

impl RandomHealthy {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Choose the next reader using the given random source.
/// Returns `None` when no reader is online; the caller then routes to the writer.
pub fn select_reader<C, R: Rng + ?Sized>(
    readers: &[Arc<Node<C>>],
    rng: &mut R,
) -> Option<Arc<Node<C>>> {
    let online: Vec<&Arc<Node<C>>> = readers.iter().filter(|r| r.is_online()).collect();

    match online.len() {
        0 => None,
        1 => Some(online[0].clone()),
        n => Some(online[rng.gen_range(0..n)].clone()),
    }
}

impl<C> LoadBalancer<C> for RandomHealthy {
    fn next_reader(&self, readers: &[Arc<Node<C>>]) -> Option<Arc<Node<C>>> {
        select_reader(readers, &mut rand::thread_rng())
    }
}
