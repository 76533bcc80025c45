//! Read functions behind each [`QueryKey`] scope.
//!
//! These are the fetchers handed to [`store::QueryCache::fetch_query`]; each
//! returns the [`QueryData`] variant its key caches.

use store::models::{Child, Declaration, Document, GpDetails, JointMember, MedicalInfo, NextOfKin};
use store::{Member, MemberDetail, Payment, QueryData, QueryKey, RecordId};

use crate::remote::{Filter, RemoteStore};
use crate::ApiError;

/// All members, newest first.
pub async fn fetch_members<R: RemoteStore>(remote: &R) -> Result<QueryData, ApiError> {
    let members = remote
        .select::<Member>(&Filter::new().order_by("created_at", false))
        .await?;
    Ok(QueryData::Members(members))
}

/// All payments, newest first.
pub async fn fetch_payments<R: RemoteStore>(remote: &R) -> Result<QueryData, ApiError> {
    let payments = remote
        .select::<Payment>(&Filter::new().order_by("created_at", false))
        .await?;
    Ok(QueryData::Payments(payments))
}

/// Everything the detail page shows for one member, read concurrently.
/// An unknown member yields `MemberDetail(None)`.
pub async fn fetch_member_detail<R: RemoteStore>(remote: &R, id: &RecordId) -> Result<QueryData, ApiError> {
    let by_id = Filter::eq("id", id);
    let by_member = Filter::eq("member_id", id);
    let payments_newest_first = by_member.clone().order_by("created_at", false);

    let (member, joint_member, children, next_of_kin, gp_details, medical_info, documents, declarations, payments) =
        futures::try_join!(
            remote.select_one::<Member>(&by_id),
            remote.select_one::<JointMember>(&by_member),
            remote.select::<Child>(&by_member),
            remote.select::<NextOfKin>(&by_member),
            remote.select_one::<GpDetails>(&by_member),
            remote.select::<MedicalInfo>(&by_member),
            remote.select::<Document>(&by_member),
            remote.select_one::<Declaration>(&by_member),
            remote.select::<Payment>(&payments_newest_first),
        )?;

    let detail = member.map(|member| {
        Box::new(MemberDetail {
            member,
            joint_member,
            children,
            next_of_kin,
            gp_details,
            medical_info,
            documents,
            declarations,
            payments,
        })
    });
    Ok(QueryData::MemberDetail(detail))
}

/// Dispatch on the key's scope.
pub async fn fetch<R: RemoteStore>(remote: &R, key: &QueryKey) -> Result<QueryData, ApiError> {
    match (key.scope(), key.id()) {
        (store::query::MEMBER_DETAIL_SCOPE, Some(id)) => fetch_member_detail(remote, id).await,
        (store::query::PAYMENTS_SCOPE, _) => fetch_payments(remote).await,
        _ => fetch_members(remote).await,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use store::models::PaymentStatus;
    use store::{Collection, MemberStatus};

    use super::*;
    use crate::MemoryBackend;

    fn member_row(id: &str, created_at: &str) -> serde_json::Value {
        json!({
            "id": id,
            "first_name": "Yusuf",
            "last_name": format!("Member{id}"),
            "status": "active",
            "created_at": created_at,
        })
    }

    #[tokio::test]
    async fn test_fetch_members_newest_first() {
        let backend = MemoryBackend::new();
        backend.insert_rows(
            Collection::Members,
            vec![
                member_row("1", "2024-01-01T00:00:00Z"),
                member_row("2", "2024-06-01T00:00:00Z"),
            ],
        );

        let data = fetch_members(&backend).await.unwrap();
        let ids: Vec<&str> = data.as_members().unwrap().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[tokio::test]
    async fn test_fetch_member_detail_collects_related_rows() {
        let backend = MemoryBackend::new();
        backend.insert_rows(Collection::Members, vec![member_row("7", "2024-01-01T00:00:00Z")]);
        backend.insert_rows(
            Collection::Children,
            vec![json!({ "id": "c1", "member_id": "7", "first_name": "Amina", "last_name": "Member7" })],
        );
        backend.insert_rows(
            Collection::Payments,
            vec![
                json!({ "id": "p1", "member_id": "7", "payment_status": "completed", "total_amount": 100.0, "created_at": "2024-01-02T00:00:00Z" }),
                json!({ "id": "p2", "member_id": "7", "payment_status": "completed", "total_amount": 25.0, "created_at": "2024-03-02T00:00:00Z" }),
                json!({ "id": "p3", "member_id": "8", "payment_status": "completed", "total_amount": 5.0, "created_at": "2024-03-02T00:00:00Z" }),
            ],
        );

        let data = fetch_member_detail(&backend, &RecordId::from("7")).await.unwrap();
        let detail = data.as_member_detail().unwrap();
        assert_eq!(detail.children.len(), 1);
        assert!(detail.joint_member.is_none());
        let payment_ids: Vec<&str> = detail.payments.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(payment_ids, vec!["p2", "p1"]);
        assert_eq!(detail.total_paid(), 125.0);
    }

    #[tokio::test]
    async fn test_unlisted_status_does_not_fail_the_list() {
        let backend = MemoryBackend::new();
        let mut archived = member_row("2", "2024-06-01T00:00:00Z");
        archived["status"] = json!("archived");
        backend.insert_rows(Collection::Members, vec![member_row("1", "2024-01-01T00:00:00Z"), archived]);
        backend.insert_rows(
            Collection::Payments,
            vec![json!({ "id": "p1", "member_id": "2", "payment_status": "disputed", "total_amount": 10.0 })],
        );

        let data = fetch_members(&backend).await.unwrap();
        let statuses: Vec<MemberStatus> = data.as_members().unwrap().iter().map(|m| m.status.clone()).collect();
        assert_eq!(statuses, vec![MemberStatus::Unknown, MemberStatus::Active]);

        let data = fetch_member_detail(&backend, &RecordId::from("2")).await.unwrap();
        let detail = data.as_member_detail().unwrap();
        assert_eq!(detail.payments[0].details.payment_status, PaymentStatus::Unknown);
        assert_eq!(detail.total_paid(), 0.0);
    }

    #[tokio::test]
    async fn test_unknown_member_detail_is_none() {
        let backend = MemoryBackend::new();
        let data = fetch(&backend, &QueryKey::member_detail("404")).await.unwrap();
        assert_eq!(data, QueryData::MemberDetail(None));
    }

    #[tokio::test]
    async fn test_read_failure_propagates() {
        let backend = MemoryBackend::new();
        backend.fail_reads(true);
        assert!(fetch_members(&backend).await.is_err());
    }
}
