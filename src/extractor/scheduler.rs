//! # Scheduler
//!
//! Pool di worker limitati e wait-group dinamico.
//!
//! ## Componenti:
//! - `WaitGroup`: contatore di task in volo; si incrementa alla sottomissione
//!   e si decrementa quando il task termina (anche in caso di panic)
//! - `WorkerPool`: task tokio limitati da un `Semaphore`, ognuno registrato
//!   nel proprio `WaitGroup`
//!
//! ## Terminazione:
//! I task del record pool possono sottomettere altri task (espansione dei
//! container). Poiché il contatore sale prima che il task che sottomette
//! finisca, `join()` ritorna solo quando non c'è davvero più lavoro.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tracing::debug;

/// Counts in-flight tasks, including tasks submitted while waiting
#[derive(Default)]
pub struct WaitGroup {
    pending: AtomicUsize,
    notify: Notify,
}

/// Decrementa il `WaitGroup` al drop
pub struct WaitGuard {
    group: Arc<WaitGroup>,
}

impl WaitGroup {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registra un task in volo
    pub fn add(self: &Arc<Self>) -> WaitGuard {
        self.pending.fetch_add(1, Ordering::SeqCst);
        WaitGuard { group: self.clone() }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Attende che il contatore arrivi a zero
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // registrazione prima del controllo: nessuna notifica persa
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        if self.group.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.group.notify.notify_waiters();
        }
    }
}

/// Bounded pool of tokio tasks
pub struct WorkerPool {
    name: &'static str,
    permits: Arc<Semaphore>,
    tasks: Arc<WaitGroup>,
}

impl WorkerPool {
    /// Crea un pool con `workers` task concorrenti al massimo
    pub fn new(name: &'static str, workers: usize) -> Self {
        debug!("Worker pool '{}' with {} workers", name, workers);
        Self {
            name,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            tasks: WaitGroup::new(),
        }
    }

    /// Sottomette un task. Non blocca: il task attende un permesso dopo
    /// essere stato registrato.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = self.tasks.add();
        let permits = self.permits.clone();
        let name = self.name;

        tokio::spawn(async move {
            let _guard = guard;
            let Ok(_permit) = permits.acquire_owned().await else {
                debug!("Worker pool '{}' closed, dropping task", name);
                return;
            };
            task.await;
        });
    }

    /// Task sottomessi e non ancora terminati
    pub fn pending(&self) -> usize {
        self.tasks.pending()
    }

    /// Attende la quiescenza del pool
    pub async fn join(&self) {
        self.tasks.wait().await;
        debug!("Worker pool '{}' drained", self.name);
    }

    /// Rifiuta i task successivi
    pub fn close(&self) {
        self.permits.close();
    }
}
