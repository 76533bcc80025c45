//! Query keys and cached query payloads.

use std::fmt;

use crate::models::{Member, MemberDetail, Payment, RecordId};

/// Scope of the member list query.
pub const MEMBERS_SCOPE: &str = "members";
/// Scope of the per-member detail query.
pub const MEMBER_DETAIL_SCOPE: &str = "member-detail";
/// Scope of the payments list query.
pub const PAYMENTS_SCOPE: &str = "payments";

/// Logical identity of a cached read: a scope plus an optional entity id.
///
/// A key without an id acts as a prefix: it [`matches`](QueryKey::matches)
/// every key of the same scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    scope: String,
    id: Option<RecordId>,
}

impl QueryKey {
    pub fn new(scope: impl Into<String>, id: Option<RecordId>) -> Self {
        Self {
            scope: scope.into(),
            id,
        }
    }

    pub fn members() -> Self {
        Self::new(MEMBERS_SCOPE, None)
    }

    pub fn member_detail(id: impl Into<RecordId>) -> Self {
        Self::new(MEMBER_DETAIL_SCOPE, Some(id.into()))
    }

    pub fn payments() -> Self {
        Self::new(PAYMENTS_SCOPE, None)
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    /// Whether `other` falls under this key.
    pub fn matches(&self, other: &QueryKey) -> bool {
        self.scope == other.scope && (self.id.is_none() || self.id == other.id)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}/{}", self.scope, id),
            None => f.write_str(&self.scope),
        }
    }
}

/// Result of a read, as held by the cache.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryData {
    Members(Vec<Member>),
    /// `None` when the member does not exist.
    MemberDetail(Option<Box<MemberDetail>>),
    Payments(Vec<Payment>),
}

impl QueryData {
    pub fn as_members(&self) -> Option<&[Member]> {
        match self {
            QueryData::Members(members) => Some(members),
            _ => None,
        }
    }

    pub fn as_members_mut(&mut self) -> Option<&mut Vec<Member>> {
        match self {
            QueryData::Members(members) => Some(members),
            _ => None,
        }
    }

    pub fn as_member_detail(&self) -> Option<&MemberDetail> {
        match self {
            QueryData::MemberDetail(detail) => detail.as_deref(),
            _ => None,
        }
    }

    pub fn as_member_detail_mut(&mut self) -> Option<&mut MemberDetail> {
        match self {
            QueryData::MemberDetail(detail) => detail.as_deref_mut(),
            _ => None,
        }
    }

    pub fn as_payments(&self) -> Option<&[Payment]> {
        match self {
            QueryData::Payments(payments) => Some(payments),
            _ => None,
        }
    }

    pub fn as_payments_mut(&mut self) -> Option<&mut Vec<Payment>> {
        match self {
            QueryData::Payments(payments) => Some(payments),
            _ => None,
        }
    }
}
