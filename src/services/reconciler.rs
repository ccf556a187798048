use crate::error::Result;
use crate::events::AppIdentity;
use crate::services::display::DisplayBackend;
use crate::services::registry::{ReconcileOutcome, Registry};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::debug_if_enabled;

/// Отложенная сверка групп с реальным набором окон.
///
/// Каждая сверка - независимая разовая задача. Задачи не отменяются:
/// перед изменением реестра каждая заново проверяет, что группа ещё
/// существует, а удаляет только окна, которых нет в свежем списке.
#[derive(Clone)]
pub struct Reconciler {
    registry: Arc<Registry>,
    backend: Arc<dyn DisplayBackend>,
    settle_delay: Duration,
    // Число запланированных сверок по приложениям
    in_flight: Arc<DashMap<AppIdentity, usize>>,
}

impl Reconciler {
    pub fn new(registry: Arc<Registry>, backend: Arc<dyn DisplayBackend>, settle_delay: Duration) -> Self {
        Self {
            registry,
            backend,
            settle_delay,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Сколько сверок для приложения ещё не выполнено
    pub fn pending_for(&self, app: &AppIdentity) -> usize {
        self.in_flight.get(app).map(|count| *count).unwrap_or(0)
    }

    /// Планирует сверку группы после задержки
    pub fn schedule(&self, app: AppIdentity) -> JoinHandle<()> {
        *self.in_flight.entry(app.clone()).or_insert(0) += 1;
        debug_if_enabled!("Сверка группы '{}' запланирована через {:?}", app, self.settle_delay);

        let reconciler = self.clone();
        tokio::spawn(async move {
            sleep(reconciler.settle_delay).await;

            if let Err(e) = reconciler.reconcile_now(&app).await {
                warn!("Сверка группы '{}' не удалась: {}", app, e);
            }

            reconciler
                .in_flight
                .remove_if_mut(&app, |_, count| {
                    *count = count.saturating_sub(1);
                    *count == 0
                });
        })
    }

    /// Сверяет группу немедленно
    pub async fn reconcile_now(&self, app: &AppIdentity) -> Result<ReconcileOutcome> {
        if !self.registry.contains(app) {
            debug_if_enabled!("Группа '{}' уже удалена, сверка не нужна", app);
            return Ok(ReconcileOutcome::GroupMissing);
        }

        // Запрос идёт без блокировки реестра; группа могла исчезнуть за это время
        let live = self.backend.query_live_windows().await?;
        let outcome = self.registry.reconcile(app, &live);
        Self::log_outcome(app, &outcome);

        Ok(outcome)
    }

    /// Планирует сверку всех групп после задержки.
    ///
    /// Нужна, когда закрылось окно, которого нет ни в одной группе: при
    /// оконном менеджере с рамками корневое окно сообщает о закрытии рамки,
    /// а не клиентского окна.
    pub fn schedule_all(&self) -> JoinHandle<()> {
        debug_if_enabled!("Сверка всех групп запланирована через {:?}", self.settle_delay);

        let reconciler = self.clone();
        tokio::spawn(async move {
            sleep(reconciler.settle_delay).await;

            if let Err(e) = reconciler.reconcile_all_now().await {
                warn!("Сверка всех групп не удалась: {}", e);
            }
        })
    }

    /// Сверяет все группы по одному списку живых окон.
    /// Возвращает число удалённых окон.
    pub async fn reconcile_all_now(&self) -> Result<usize> {
        if self.registry.is_empty() {
            return Ok(0);
        }

        let live = self.backend.query_live_windows().await?;
        let mut removed_total = 0;
        for app in self.registry.apps() {
            let outcome = self.registry.reconcile(&app, &live);
            if let ReconcileOutcome::Pruned { removed, .. } = &outcome {
                removed_total += removed.len();
            }
            Self::log_outcome(&app, &outcome);
        }

        Ok(removed_total)
    }

    fn log_outcome(app: &AppIdentity, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Pruned { removed, group_deleted } => {
                info!(
                    "Сверка группы '{}': удалено окон {} ({:?}), группа удалена: {}",
                    app,
                    removed.len(),
                    removed,
                    group_deleted
                );
            }
            ReconcileOutcome::Unchanged => {
                debug_if_enabled!("Сверка группы '{}': изменений нет", app);
            }
            ReconcileOutcome::GroupMissing => {
                debug_if_enabled!("Группа '{}' удалена во время сверки", app);
            }
        }
    }
}
