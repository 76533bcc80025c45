//! # Membership mutations
//!
//! The four writes the dashboard performs optimistically. Each one is an
//! [`OptimisticMutation`] run through [`store::MutationCoordinator`], which
//! handles cancellation, snapshots, rollback and invalidation; this module only
//! says which keys are touched, what the optimistic cache looks like and which
//! remote write confirms it.
//!
//! | Mutation | Keys | Optimistic change |
//! |----------|------|-------------------|
//! | [`MemberStatusUpdate`] | `members`, `member-detail/<id>` | set `status` |
//! | [`AddPayment`] | `payments`, `member-detail/<member_id>` | prepend a placeholder payment |
//! | [`DeleteMember`] | `members`, `member-detail/<id>` | drop the member, leave the detail route |
//! | [`ToggleFavorite`] | `members`, `member-detail/<id>` | flip `is_favorite` |

use serde_json::json;
use store::{
    Member, MemberStatus, NewPayment, OptimisticMutation, Payment, QueryCache, QueryData, QueryKey, RecordId,
};

use crate::navigation::{member_route, Navigator, MEMBERS_ROUTE};
use crate::remote::{Filter, RemoteStore};
use crate::ApiError;

/// Apply `edit` to member `id` wherever it is cached: the list and its detail.
fn edit_member(cache: &QueryCache, id: &RecordId, edit: impl Fn(&mut Member)) {
    cache.update_query_data(&QueryKey::members(), |data| {
        if let Some(members) = data.as_members_mut() {
            members.iter_mut().filter(|m| &m.id == id).for_each(&edit);
        }
    });
    cache.update_query_data(&QueryKey::member_detail(id.clone()), |data| {
        if let Some(detail) = data.as_member_detail_mut() {
            edit(&mut detail.member);
        }
    });
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatusChange {
    pub member_id: RecordId,
    pub new_status: MemberStatus,
}

pub struct MemberStatusUpdate<R> {
    remote: R,
}

impl<R: RemoteStore> MemberStatusUpdate<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }
}

impl<R: RemoteStore> OptimisticMutation for MemberStatusUpdate<R> {
    type Vars = StatusChange;
    type Output = ();
    type Error = ApiError;

    fn name(&self) -> &'static str {
        "member-status-update"
    }

    fn affected_keys(&self, vars: &StatusChange) -> Vec<QueryKey> {
        vec![QueryKey::members(), QueryKey::member_detail(vars.member_id.clone())]
    }

    fn apply(&self, cache: &QueryCache, vars: &StatusChange) {
        edit_member(cache, &vars.member_id, |m| m.status = vars.new_status.clone());
    }

    async fn dispatch(&self, vars: StatusChange) -> Result<(), ApiError> {
        self.remote
            .update::<Member>(json!({ "status": vars.new_status }), &Filter::eq("id", &vars.member_id))
            .await
    }
}

/// Records a payment. Until the insert returns, the payment is shown with a
/// placeholder id; the refetch after settlement brings the server id.
pub struct AddPayment<R> {
    remote: R,
}

impl<R: RemoteStore> AddPayment<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }
}

impl<R: RemoteStore> OptimisticMutation for AddPayment<R> {
    type Vars = NewPayment;
    type Output = Payment;
    type Error = ApiError;

    fn name(&self) -> &'static str {
        "add-payment"
    }

    fn affected_keys(&self, vars: &NewPayment) -> Vec<QueryKey> {
        vec![QueryKey::payments(), QueryKey::member_detail(vars.member_id.clone())]
    }

    fn apply(&self, cache: &QueryCache, vars: &NewPayment) {
        let optimistic = Payment::optimistic(vars.clone());

        cache.set_query_data_with(QueryKey::payments(), |previous| {
            let mut payments = match previous {
                Some(QueryData::Payments(payments)) => payments,
                _ => Vec::new(),
            };
            payments.insert(0, optimistic.clone());
            QueryData::Payments(payments)
        });
        cache.update_query_data(&QueryKey::member_detail(vars.member_id.clone()), |data| {
            if let Some(detail) = data.as_member_detail_mut() {
                detail.payments.insert(0, optimistic.clone());
            }
        });
    }

    async fn dispatch(&self, vars: NewPayment) -> Result<Payment, ApiError> {
        self.remote.insert::<Payment, _>(&vars).await
    }
}

/// Deletes a member and leaves its detail page straight away. A failed delete
/// returns to the detail page.
pub struct DeleteMember<R, N> {
    remote: R,
    navigator: N,
}

impl<R: RemoteStore, N: Navigator> DeleteMember<R, N> {
    pub fn new(remote: R, navigator: N) -> Self {
        Self { remote, navigator }
    }
}

impl<R: RemoteStore, N: Navigator> OptimisticMutation for DeleteMember<R, N> {
    type Vars = RecordId;
    type Output = ();
    type Error = ApiError;

    fn name(&self) -> &'static str {
        "delete-member"
    }

    fn affected_keys(&self, id: &RecordId) -> Vec<QueryKey> {
        vec![QueryKey::members(), QueryKey::member_detail(id.clone())]
    }

    fn apply(&self, cache: &QueryCache, id: &RecordId) {
        cache.update_query_data(&QueryKey::members(), |data| {
            if let Some(members) = data.as_members_mut() {
                members.retain(|m| &m.id != id);
            }
        });
    }

    fn after_apply(&self, _id: &RecordId) {
        self.navigator.push(MEMBERS_ROUTE);
    }

    fn after_rollback(&self, id: &RecordId) {
        self.navigator.push(&member_route(id));
    }

    async fn dispatch(&self, id: RecordId) -> Result<(), ApiError> {
        self.remote.delete::<Member>(&Filter::eq("id", &id)).await
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FavoriteToggle {
    pub member_id: RecordId,
    /// The value before the toggle.
    pub is_favorite: bool,
}

pub struct ToggleFavorite<R> {
    remote: R,
}

impl<R: RemoteStore> ToggleFavorite<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }
}

impl<R: RemoteStore> OptimisticMutation for ToggleFavorite<R> {
    type Vars = FavoriteToggle;
    type Output = ();
    type Error = ApiError;

    fn name(&self) -> &'static str {
        "toggle-favorite"
    }

    fn affected_keys(&self, vars: &FavoriteToggle) -> Vec<QueryKey> {
        vec![QueryKey::members(), QueryKey::member_detail(vars.member_id.clone())]
    }

    fn apply(&self, cache: &QueryCache, vars: &FavoriteToggle) {
        edit_member(cache, &vars.member_id, |m| m.is_favorite = !vars.is_favorite);
    }

    async fn dispatch(&self, vars: FavoriteToggle) -> Result<(), ApiError> {
        self.remote
            .update::<Member>(
                json!({ "is_favorite": !vars.is_favorite }),
                &Filter::eq("id", &vars.member_id),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;
    use serde_json::Value;
    use store::models::PaymentStatus;
    use store::{Collection, MutationCoordinator};

    use super::*;
    use crate::navigation::History;
    use crate::queries::{fetch_member_detail, fetch_members, fetch_payments};
    use crate::MemoryBackend;

    fn member_row(id: &str, status: &str) -> Value {
        json!({
            "id": id,
            "first_name": "Hamza",
            "last_name": format!("Member{id}"),
            "status": status,
            "created_at": format!("2024-01-{:02}T00:00:00Z", id.len()),
        })
    }

    fn payment_row(id: &str, member_id: &str, created_at: &str) -> Value {
        json!({
            "id": id,
            "member_id": member_id,
            "payment_status": "completed",
            "total_amount": 150.0,
            "created_at": created_at,
        })
    }

    fn seeded() -> (MemoryBackend, QueryCache, MutationCoordinator) {
        let backend = MemoryBackend::new();
        backend.insert_rows(
            Collection::Members,
            vec![member_row("7", "active"), member_row("42", "active")],
        );
        backend.insert_rows(Collection::Payments, vec![payment_row("p-1", "7", "2024-02-01T00:00:00Z")]);
        let cache = QueryCache::new();
        let coordinator = MutationCoordinator::new(cache.clone());
        (backend, cache, coordinator)
    }

    async fn load(backend: &MemoryBackend, cache: &QueryCache, key: QueryKey) {
        let remote = backend.clone();
        let fetch_key = key.clone();
        cache
            .fetch_query(key, move || async move { crate::queries::fetch(&remote, &fetch_key).await })
            .await
            .unwrap();
    }

    fn member_status(cache: &QueryCache, id: &str) -> Option<MemberStatus> {
        cache
            .get_query_data(&QueryKey::members())?
            .as_members()?
            .iter()
            .find(|m| m.id.as_str() == id)
            .map(|m| m.status.clone())
    }

    fn new_payment(member_id: &str) -> NewPayment {
        NewPayment {
            member_id: RecordId::from(member_id),
            payment_type: Some("membership".into()),
            payment_method: Some("cash".into()),
            payment_status: PaymentStatus::Completed,
            main_joining_fee: None,
            main_membership_fee: Some(120.0),
            joint_joining_fee: None,
            joint_membership_fee: None,
            late_fee: None,
            total_amount: 120.0,
            payment_date: None,
            reference_no: None,
            processed_by: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_status_update_reverts_on_failure() {
        let (backend, cache, coordinator) = seeded();
        load(&backend, &cache, QueryKey::members()).await;
        load(&backend, &cache, QueryKey::member_detail("42")).await;
        let members_before = cache.get_query_data(&QueryKey::members());
        let detail_before = cache.get_query_data(&QueryKey::member_detail("42"));

        let gate = backend.hold_writes();
        let mutation = MemberStatusUpdate::new(backend.clone());
        let change = StatusChange {
            member_id: "42".into(),
            new_status: MemberStatus::Paused,
        };
        let mut run = coordinator.run(&mutation, change).boxed_local();

        assert!(futures::poll!(run.as_mut()).is_pending());
        assert_eq!(member_status(&cache, "42"), Some(MemberStatus::Paused));
        let detail = cache.get_query_data(&QueryKey::member_detail("42")).unwrap();
        assert_eq!(detail.as_member_detail().unwrap().member.status, MemberStatus::Paused);

        backend.fail_writes(true);
        gate.release();
        assert!(run.await.is_err());

        assert_eq!(cache.get_query_data(&QueryKey::members()), members_before);
        assert_eq!(cache.get_query_data(&QueryKey::member_detail("42")), detail_before);
        assert!(cache.is_stale(&QueryKey::members()));
        assert!(cache.is_stale(&QueryKey::member_detail("42")));
    }

    #[tokio::test]
    async fn test_status_update_success_matches_remote() {
        let (backend, cache, coordinator) = seeded();
        load(&backend, &cache, QueryKey::members()).await;

        let mutation = MemberStatusUpdate::new(backend.clone());
        let change = StatusChange {
            member_id: "42".into(),
            new_status: MemberStatus::Paused,
        };
        coordinator.run(&mutation, change).await.unwrap();

        assert!(cache.is_stale(&QueryKey::members()));
        load(&backend, &cache, QueryKey::members()).await;
        assert_eq!(member_status(&cache, "42"), Some(MemberStatus::Paused));
        assert_eq!(cache.get_query_data(&QueryKey::members()), Some(fetch_members(&backend).await.unwrap()));
    }

    #[tokio::test]
    async fn test_add_payment_placeholder_then_server_id() {
        let (backend, cache, coordinator) = seeded();
        load(&backend, &cache, QueryKey::payments()).await;
        load(&backend, &cache, QueryKey::member_detail("7")).await;

        let gate = backend.hold_writes();
        let mutation = AddPayment::new(backend.clone());
        let mut run = coordinator.run(&mutation, new_payment("7")).boxed_local();
        assert!(futures::poll!(run.as_mut()).is_pending());

        let payments = cache.get_query_data(&QueryKey::payments()).unwrap();
        let head = &payments.as_payments().unwrap()[0];
        assert!(head.id.is_placeholder());
        assert_eq!(head.details.total_amount, 120.0);
        assert_eq!(payments.as_payments().unwrap().len(), 2);
        let detail = cache.get_query_data(&QueryKey::member_detail("7")).unwrap();
        assert_eq!(detail.as_member_detail().unwrap().payments[0].id, head.id);

        gate.release();
        let stored = run.await.unwrap();
        assert!(!stored.id.is_placeholder());

        load(&backend, &cache, QueryKey::payments()).await;
        let payments = cache.get_query_data(&QueryKey::payments()).unwrap();
        let payments = payments.as_payments().unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].id, stored.id);
        assert!(payments.iter().all(|p| !p.id.is_placeholder()));
        assert_eq!(Some(QueryData::Payments(payments.to_vec())), Some(fetch_payments(&backend).await.unwrap()));
    }

    #[tokio::test]
    async fn test_add_payment_without_cached_list_rolls_back_to_absent() {
        let (backend, cache, coordinator) = seeded();
        backend.fail_writes(true);

        let mutation = AddPayment::new(backend.clone());
        assert!(coordinator.run(&mutation, new_payment("7")).await.is_err());
        assert!(cache.entry(&QueryKey::payments()).is_none());
        assert!(cache.entry(&QueryKey::member_detail("7")).is_none());
    }

    #[tokio::test]
    async fn test_delete_member_navigates_back_on_failure() {
        let (backend, cache, coordinator) = seeded();
        load(&backend, &cache, QueryKey::members()).await;
        let members_before = cache.get_query_data(&QueryKey::members());
        let history = History::new("/members/7");

        let gate = backend.hold_writes();
        let mutation = DeleteMember::new(backend.clone(), history.clone());
        let mut run = coordinator.run(&mutation, RecordId::from("7")).boxed_local();
        assert!(futures::poll!(run.as_mut()).is_pending());

        assert_eq!(member_status(&cache, "7"), None);
        assert_eq!(history.current().as_deref(), Some("/members"));

        backend.fail_writes(true);
        gate.release();
        assert!(run.await.is_err());

        assert_eq!(cache.get_query_data(&QueryKey::members()), members_before);
        assert_eq!(member_status(&cache, "7"), Some(MemberStatus::Active));
        assert_eq!(history.current().as_deref(), Some("/members/7"));
        assert_eq!(backend.rows(Collection::Members).len(), 2);
    }

    #[tokio::test]
    async fn test_delete_member_success() {
        let (backend, cache, coordinator) = seeded();
        load(&backend, &cache, QueryKey::members()).await;
        let history = History::new("/members/7");

        let mutation = DeleteMember::new(backend.clone(), history.clone());
        coordinator.run(&mutation, RecordId::from("7")).await.unwrap();

        assert_eq!(history.entries(), vec!["/members/7", "/members"]);
        load(&backend, &cache, QueryKey::members()).await;
        assert_eq!(member_status(&cache, "7"), None);
        let detail = fetch_member_detail(&backend, &RecordId::from("7")).await.unwrap();
        assert_eq!(detail, QueryData::MemberDetail(None));
    }

    #[tokio::test]
    async fn test_toggle_favorite() {
        let (backend, cache, coordinator) = seeded();
        load(&backend, &cache, QueryKey::members()).await;

        let mutation = ToggleFavorite::new(backend.clone());
        let toggle = FavoriteToggle {
            member_id: "42".into(),
            is_favorite: false,
        };
        coordinator.run(&mutation, toggle).await.unwrap();

        let data = cache.get_query_data(&QueryKey::members()).unwrap();
        let member = data.as_members().unwrap().iter().find(|m| m.id.as_str() == "42").unwrap();
        assert!(member.is_favorite);
        assert!(cache.is_stale(&QueryKey::members()));

        let row = backend
            .rows(Collection::Members)
            .into_iter()
            .find(|r| r["id"] == "42")
            .unwrap();
        assert_eq!(row["is_favorite"], json!(true));
    }

    #[tokio::test]
    async fn test_toggle_favorite_failure_restores_flag() {
        let (backend, cache, coordinator) = seeded();
        load(&backend, &cache, QueryKey::members()).await;
        let before = cache.get_query_data(&QueryKey::members());
        backend.fail_writes(true);

        let mutation = ToggleFavorite::new(backend.clone());
        let toggle = FavoriteToggle {
            member_id: "42".into(),
            is_favorite: false,
        };
        assert!(coordinator.run(&mutation, toggle).await.is_err());
        assert_eq!(cache.get_query_data(&QueryKey::members()), before);
    }
}
