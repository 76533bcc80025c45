//! Hooks for the optimistic membership writes.
//!
//! Each hook builds its [`OptimisticMutation`] once per component and returns a
//! [`Mutation`] handle: `mutate(vars)` runs it through the shared coordinator
//! in a root-scoped task, and `state` tracks pending / success / error for
//! buttons and banners. Failures also land in the activity log.

use std::rc::Rc;

use api::{AddPayment, ApiError, DeleteMember, FavoriteToggle, MemberStatusUpdate, StatusChange, ToggleFavorite};
use dioxus::core::spawn_forever;
use dioxus::prelude::*;
use store::{MutationState, NewPayment, OptimisticMutation, RecordId};

use crate::activity_log::{log_activity, use_activity_log, LogLevel};
use crate::backend::use_backend;
use crate::navigation::use_router_navigator;
use crate::query::use_query_client;

pub struct Mutation<V: 'static> {
    pub state: Signal<MutationState>,
    trigger: Callback<V>,
}

impl<V: 'static> Clone for Mutation<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V: 'static> Copy for Mutation<V> {}

impl<V: 'static> Mutation<V> {
    pub fn mutate(&self, vars: V) {
        self.trigger.call(vars);
    }

    pub fn is_pending(&self) -> bool {
        self.state.read().is_pending()
    }
}

fn use_mutation<M>(build: impl FnOnce() -> Option<M>) -> Mutation<M::Vars>
where
    M: OptimisticMutation<Error = ApiError> + 'static,
    M::Vars: 'static,
{
    let client = use_query_client();
    let mut activity = use_activity_log();
    let mutation = use_hook(move || Rc::new(build()));
    let mut state = use_signal(MutationState::default);

    let trigger = use_callback(move |vars: M::Vars| {
        let mutation = mutation.clone();
        let Some(name) = mutation.as_ref().as_ref().map(|m| m.name()) else {
            tracing::warn!("mutation requested without a backend");
            return;
        };
        let coordinator = client.coordinator.clone();
        state.set(MutationState::pending());
        // Navigation may unmount the caller mid-flight; the write and its
        // rollback must still run to completion.
        spawn_forever(async move {
            let Some(m) = mutation.as_ref().as_ref() else {
                return;
            };
            let result = coordinator.run(m, vars).await;
            match &result {
                Ok(_) => log_activity(&mut activity, LogLevel::Success, name),
                Err(err) => log_activity(&mut activity, LogLevel::Error, &format!("{name} failed: {err}")),
            }
            if let Ok(mut current) = state.try_write() {
                *current = MutationState::settled(&result);
            }
        });
    });

    Mutation { state, trigger }
}

pub fn use_member_status_update() -> Mutation<StatusChange> {
    let backend = use_backend();
    use_mutation(move || backend.map(MemberStatusUpdate::new))
}

pub fn use_add_payment() -> Mutation<NewPayment> {
    let backend = use_backend();
    use_mutation(move || backend.map(AddPayment::new))
}

/// Leaves the detail page immediately; returns to it if the delete fails.
pub fn use_delete_member() -> Mutation<RecordId> {
    let backend = use_backend();
    let navigator = use_router_navigator();
    use_mutation(move || backend.map(|b| DeleteMember::new(b, navigator)))
}

pub fn use_toggle_favorite() -> Mutation<FavoriteToggle> {
    let backend = use_backend();
    use_mutation(move || backend.map(ToggleFavorite::new))
}
