//! # Record types for the membership collections
//!
//! One struct per remote collection, with required and optional fields spelled
//! out. Rows are deserialized into these types at the remote-store boundary, so
//! a row that is missing a required column (or carries an unknown status) is
//! rejected there instead of leaking an untyped object into the cache.
//!
//! ## Types
//!
//! | Struct | Collection |
//! |--------|-----------|
//! | [`Member`] | `members` |
//! | [`JointMember`] | `joint_members` |
//! | [`Child`] | `children` |
//! | [`NextOfKin`] | `next_of_kin` |
//! | [`GpDetails`] | `gp_details` |
//! | [`MedicalInfo`] | `medical_info` |
//! | [`Document`] | `documents` |
//! | [`Declaration`] | `declarations` |
//! | [`Payment`] / [`NewPayment`] | `payments` |
//!
//! [`MemberDetail`] is the aggregate read behind the detail page: one member
//! plus everything keyed by its `member_id`.
//!
//! ## Identifiers
//!
//! [`RecordId`] wraps the opaque server identifier. Optimistic inserts use
//! [`RecordId::placeholder`], which yields `temp-<millis>-<counter>` values that
//! can never collide with each other. [`RecordId::is_placeholder`] reports the
//! mark set at creation, never a guess from the text.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const PLACEHOLDER_PREFIX: &str = "temp-";

static PLACEHOLDER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Primary key of a remote row.
///
/// Placeholders are marked when they are minted, not recognised by their
/// text, so a server id that happens to look like one is still a server id.
/// The mark is local only: ids serialize as their text and always
/// deserialize as server ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    value: String,
    placeholder: bool,
}

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            value: id.into(),
            placeholder: false,
        }
    }

    /// A locally unique identifier for a record that has not reached the
    /// server yet.
    pub fn placeholder() -> Self {
        let seq = PLACEHOLDER_COUNTER.fetch_add(1, Ordering::Relaxed);
        let millis = Utc::now().timestamp_millis();
        Self {
            value: format!("{PLACEHOLDER_PREFIX}{millis}-{seq}"),
            placeholder: true,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

// Some tables use integer keys; accept both and keep the textual form.
impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => RecordId::new(s),
            Raw::Int(n) => RecordId::new(n.to_string()),
        })
    }
}

/// Remote collections reachable through the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Members,
    Payments,
    Children,
    NextOfKin,
    GpDetails,
    MedicalInfo,
    Documents,
    Declarations,
    JointMembers,
    Users,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Members => "members",
            Collection::Payments => "payments",
            Collection::Children => "children",
            Collection::NextOfKin => "next_of_kin",
            Collection::GpDetails => "gp_details",
            Collection::MedicalInfo => "medical_info",
            Collection::Documents => "documents",
            Collection::Declarations => "declarations",
            Collection::JointMembers => "joint_members",
            Collection::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binds a record type to the collection it is stored in.
pub trait Table {
    const COLLECTION: Collection;
}

/// Membership status. Values this client does not know decode as
/// [`MemberStatus::Unknown`] so one odd row cannot fail a whole list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Pending,
    Paused,
    Inactive,
    Deceased,
    #[serde(other)]
    Unknown,
}

impl MemberStatus {
    pub const ALL: [MemberStatus; 5] = [
        MemberStatus::Active,
        MemberStatus::Pending,
        MemberStatus::Paused,
        MemberStatus::Inactive,
        MemberStatus::Deceased,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Pending => "pending",
            MemberStatus::Paused => "paused",
            MemberStatus::Inactive => "inactive",
            MemberStatus::Deceased => "deceased",
            MemberStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single or joint application.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    #[default]
    Single,
    Joint,
}

/// A row of the `members` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: RecordId,
    #[serde(default)]
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub home_phone: Option<String>,
    #[serde(default)]
    pub work_phone: Option<String>,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub address_line_1: Option<String>,
    #[serde(default)]
    pub address_line_2: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub app_type: AppType,
    pub status: MemberStatus,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Member {
    /// "Title First Last", skipping an empty title.
    pub fn full_name(&self) -> String {
        match self.title.as_deref().filter(|t| !t.is_empty()) {
            Some(title) => format!("{title} {} {}", self.first_name, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

impl Table for Member {
    const COLLECTION: Collection = Collection::Members;
}

/// Second applicant on a joint membership.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointMember {
    pub id: RecordId,
    pub member_id: RecordId,
    #[serde(default)]
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub home_phone: Option<String>,
    #[serde(default)]
    pub work_phone: Option<String>,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub address_line_1: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
}

impl Table for JointMember {
    const COLLECTION: Collection = Collection::JointMembers;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: RecordId,
    pub member_id: RecordId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub relation: Option<String>,
}

impl Table for Child {
    const COLLECTION: Collection = Collection::Children;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NextOfKin {
    pub id: RecordId,
    pub member_id: RecordId,
    #[serde(default)]
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address_line_1: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
}

impl Table for NextOfKin {
    const COLLECTION: Collection = Collection::NextOfKin;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GpDetails {
    pub id: RecordId,
    pub member_id: RecordId,
    #[serde(default)]
    pub gp_name_surgery: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address_line_1: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
}

impl Table for GpDetails {
    const COLLECTION: Collection = Collection::GpDetails;
}

/// Which applicant a medical or declaration row refers to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    Main,
    Joint,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MedicalInfo {
    pub id: RecordId,
    pub member_id: RecordId,
    pub member_type: MemberType,
    #[serde(default)]
    pub disclaimer: Option<String>,
    #[serde(default)]
    pub conditions: Option<String>,
}

impl Table for MedicalInfo {
    const COLLECTION: Collection = Collection::MedicalInfo;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: RecordId,
    pub member_id: RecordId,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Table for Document {
    const COLLECTION: Collection = Collection::Documents;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: RecordId,
    pub member_id: RecordId,
    #[serde(default)]
    pub agreement_sig_1: bool,
    #[serde(default)]
    pub agreement_sig_2: bool,
    #[serde(default)]
    pub funding_sig_1: bool,
    #[serde(default)]
    pub funding_sig_2: bool,
    #[serde(default)]
    pub declaration_sig_1: bool,
    #[serde(default)]
    pub declaration_sig_2: bool,
    #[serde(default)]
    pub signed_at: Option<DateTime<Utc>>,
}

impl Table for Declaration {
    const COLLECTION: Collection = Collection::Declarations;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment fields supplied by the client when recording a payment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub member_id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_joining_fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_membership_fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint_joining_fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint_membership_fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub late_fee: Option<f64>,
    pub total_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A row of the `payments` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: RecordId,
    #[serde(flatten)]
    pub details: NewPayment,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Build the locally displayed row for a payment that is still in flight.
    pub fn optimistic(details: NewPayment) -> Self {
        Self {
            id: RecordId::placeholder(),
            details,
            created_at: Some(Utc::now()),
        }
    }
}

impl Table for Payment {
    const COLLECTION: Collection = Collection::Payments;
}

/// Everything the detail page shows for one member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberDetail {
    pub member: Member,
    pub joint_member: Option<JointMember>,
    pub children: Vec<Child>,
    pub next_of_kin: Vec<NextOfKin>,
    pub gp_details: Option<GpDetails>,
    pub medical_info: Vec<MedicalInfo>,
    pub documents: Vec<Document>,
    pub declarations: Option<Declaration>,
    /// Newest first.
    pub payments: Vec<Payment>,
}

impl MemberDetail {
    /// Sum of completed payments.
    pub fn total_paid(&self) -> f64 {
        self.payments
            .iter()
            .filter(|p| p.details.payment_status == PaymentStatus::Completed)
            .map(|p| p.details.total_amount)
            .sum()
    }
}
