// Abstraction des timers : permet de piloter les délais Hello/Dead/LSA sans
// dépendre directement de l'horloge tokio dans la logique du routeur.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Poignée sur un timer arme. Annule le timer si elle est droppee ou si
/// `cancel` est appele explicitement; un nouveau Hello remplace la poignee
/// plutot que de la reutiliser, ce qui reporte naturellement l'echeance.
pub struct TimerHandle {
    inner: Option<JoinHandle<()>>,
}

impl TimerHandle {
    fn spawned(handle: JoinHandle<()>) -> Self {
        TimerHandle { inner: Some(handle) }
    }

    /// Poignee qui n'annule rien : utile dans les tests ou quand aucun
    /// timer reel n'a ete arme.
    pub fn noop() -> Self {
        TimerHandle { inner: None }
    }

    pub fn cancel(mut self) {
        if let Some(handle) = self.inner.take() {
            handle.abort();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.take() {
            handle.abort();
        }
    }
}

/// Contrat d'un service de minuterie : armer un callback a executer une fois
/// apres `delay`, ou a interval regulier. Abstrait derriere un trait pour que
/// le coeur du routeur reste testable sans executeur tokio reel.
pub trait TimerService: Send + Sync {
    /// Arme un callback a usage unique, declenche apres `delay`.
    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Arme un callback repete toutes les `period`, jusqu'a annulation de la poignee.
    fn every(&self, period: Duration, callback: TimerCallback) -> TimerHandle;
}

/// Callback declenche par un timer. Boxe car le type concret varie par appel.
pub type TimerCallback = Box<dyn FnMut() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// Implementation reelle adossee a `tokio::time`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimerService;

impl TimerService for TokioTimerService {
    fn after(&self, delay: Duration, mut callback: TimerCallback) -> TimerHandle {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback().await;
        });
        TimerHandle::spawned(handle)
    }

    fn every(&self, period: Duration, mut callback: TimerCallback) -> TimerHandle {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // premier tick immediat, on l'ignore
            loop {
                interval.tick().await;
                callback().await;
            }
        });
        TimerHandle::spawned(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn after_fires_once_past_the_delay() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let svc = TokioTimerService;
        let _handle = svc.after(
            Duration::from_secs(5),
            Box::new(move || {
                let count = Arc::clone(&count_clone);
                Box::pin(async move {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            }),
        );
        tokio::time::advance(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_further_firing() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let svc = TokioTimerService;
        let handle = svc.every(
            Duration::from_secs(1),
            Box::new(move || {
                let count = Arc::clone(&count_clone);
                Box::pin(async move {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            }),
        );
        tokio::time::advance(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;
        handle.cancel();
        let seen_before_cancel = count.load(Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), seen_before_cancel);
        assert!(seen_before_cancel >= 1);
    }
}
