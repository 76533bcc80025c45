use chrono::Local;
use dioxus::prelude::*;
use store::{MemberDetail, MemberStatus, NewPayment, Payment, PaymentStatus, QueryKey, RecordId};

use super::members::StatusBadge;
use super::ModalOverlay;
use crate::auth::use_auth;
use crate::loading::{LoadingSpinner, SpinnerSize};
use crate::mutations::{use_add_payment, use_delete_member, use_member_status_update, use_toggle_favorite};
use crate::query::use_query;
use api::{FavoriteToggle, StatusChange};

const CARD: &str = "background: #fff; border: 1px solid #e5e7eb; border-radius: 8px; padding: 1rem; margin-bottom: 1rem;";
const HEADING: &str = "font-size: 1rem; font-weight: 600; margin: 0 0 0.75rem 0;";
const BUTTON: &str = "padding: 0.375rem 0.875rem; border: 1px solid #d1d5db; border-radius: 4px; background: #fff; cursor: pointer;";

/// Everything recorded for one member, with status, favorite, payment and
/// delete actions.
#[component]
pub fn MemberDetailView(member_id: String, on_back: EventHandler<()>) -> Element {
    let query = use_query(QueryKey::member_detail(member_id.as_str()));
    let result = query();

    let detail = result.data.as_ref().and_then(|d| d.as_member_detail()).cloned();

    let body = match detail {
        Some(detail) => rsx! {
            MemberDetailBody { detail }
        },
        None if result.loading => rsx! {
            div {
                style: "display: flex; justify-content: center; padding: 3rem;",
                LoadingSpinner { size: SpinnerSize::Large }
            }
        },
        None => match &result.error {
            Some(error) => rsx! {
                div {
                    style: "padding: 0.75rem; background: #fee2e2; color: #991b1b; border-radius: 4px;",
                    "Could not load member: {error}"
                }
            },
            None => rsx! {
                p { style: "color: #6b7280;", "This member no longer exists." }
            },
        },
    };

    rsx! {
        div {
            style: "padding: 1.5rem; max-width: 64rem; margin: 0 auto;",
            button {
                style: "{BUTTON} margin-bottom: 1rem;",
                onclick: move |_| on_back.call(()),
                "← Back to members"
            }
            {body}
        }
    }
}

#[component]
fn MemberDetailBody(detail: MemberDetail) -> Element {
    let status_update = use_member_status_update();
    let favorite = use_toggle_favorite();
    let delete = use_delete_member();
    let mut confirm_delete = use_signal(|| false);

    let member = detail.member.clone();
    let name = member.full_name();
    let star = if member.is_favorite { "★ Favorite" } else { "☆ Add to favorites" };
    let current_status = member.status.as_str();
    let total_paid = format!("{:.2}", detail.total_paid());

    let status_id = member.id.clone();
    let favorite_id = member.id.clone();
    let delete_id = member.id.clone();
    let is_favorite = member.is_favorite;

    let contact = [
        ("Email", member.email.clone()),
        ("Mobile", member.mobile.clone()),
        ("Home phone", member.home_phone.clone()),
        ("Work phone", member.work_phone.clone()),
        ("Date of birth", member.dob.map(|d| d.format("%d/%m/%Y").to_string())),
        ("Address", join_address(&[
            member.address_line_1.as_deref(),
            member.address_line_2.as_deref(),
            member.town.as_deref(),
            member.city.as_deref(),
            member.postcode.as_deref(),
        ])),
    ];

    rsx! {
        div {
            style: "display: flex; align-items: center; gap: 1rem; margin-bottom: 1rem;",
            h1 { style: "font-size: 1.5rem; font-weight: 700; margin: 0;", "{name}" }
            StatusBadge { status: member.status.clone() }
            button {
                style: "{BUTTON} color: #d97706;",
                disabled: favorite.is_pending(),
                onclick: move |_| favorite.mutate(FavoriteToggle {
                    member_id: favorite_id.clone(),
                    is_favorite,
                }),
                "{star}"
            }
            select {
                style: "margin-left: auto; padding: 0.375rem; border: 1px solid #d1d5db; border-radius: 4px;",
                disabled: status_update.is_pending(),
                value: "{current_status}",
                onchange: move |evt| {
                    if let Some(new_status) = MemberStatus::parse(&evt.value()) {
                        status_update.mutate(StatusChange {
                            member_id: status_id.clone(),
                            new_status,
                        });
                    }
                },
                for status in MemberStatus::ALL {
                    option {
                        value: "{status}",
                        selected: status.as_str() == current_status,
                        "{status}"
                    }
                }
            }
            button {
                style: "{BUTTON} color: #b91c1c; border-color: #fca5a5;",
                disabled: delete.is_pending(),
                onclick: move |_| confirm_delete.set(true),
                "Delete"
            }
        }

        if let Some(error) = status_update.state.read().error.clone() {
            ErrorBanner { message: format!("Status change failed: {error}") }
        }
        if let Some(error) = delete.state.read().error.clone() {
            ErrorBanner { message: format!("Delete failed: {error}") }
        }

        div {
            style: CARD,
            h2 { style: HEADING, "Contact" }
            for (label, value) in contact {
                if let Some(value) = value {
                    Field { label, value }
                }
            }
            if let Some(notes) = member.notes.clone() {
                Field { label: "Notes", value: notes }
            }
        }

        if let Some(joint) = detail.joint_member.clone() {
            div {
                style: CARD,
                h2 { style: HEADING, "Joint member" }
                Field { label: "Name", value: format!("{} {}", joint.first_name, joint.last_name) }
                if let Some(email) = joint.email {
                    Field { label: "Email", value: email }
                }
                if let Some(mobile) = joint.mobile {
                    Field { label: "Mobile", value: mobile }
                }
            }
        }

        if !detail.children.is_empty() {
            div {
                style: CARD,
                h2 { style: HEADING, "Children" }
                for child in detail.children.clone() {
                    Field {
                        key: "{child.id}",
                        label: child.relation.clone().unwrap_or_else(|| "Child".to_string()),
                        value: format!("{} {}", child.first_name, child.last_name),
                    }
                }
            }
        }

        if !detail.next_of_kin.is_empty() {
            div {
                style: CARD,
                h2 { style: HEADING, "Next of kin" }
                for kin in detail.next_of_kin.clone() {
                    Field {
                        key: "{kin.id}",
                        label: kin.relationship.clone().unwrap_or_else(|| "Contact".to_string()),
                        value: [Some(format!("{} {}", kin.first_name, kin.last_name)), kin.phone.clone().or(kin.mobile.clone())]
                            .into_iter()
                            .flatten()
                            .collect::<Vec<_>>()
                            .join(" · "),
                    }
                }
            }
        }

        if let Some(gp) = detail.gp_details.clone() {
            div {
                style: CARD,
                h2 { style: HEADING, "GP" }
                if let Some(surgery) = gp.gp_name_surgery {
                    Field { label: "Surgery", value: surgery }
                }
                if let Some(phone) = gp.phone {
                    Field { label: "Phone", value: phone }
                }
            }
        }

        if !detail.medical_info.is_empty() {
            div {
                style: CARD,
                h2 { style: HEADING, "Medical" }
                for info in detail.medical_info.clone() {
                    Field {
                        key: "{info.id}",
                        label: format!("{:?}", info.member_type),
                        value: info.conditions.clone().unwrap_or_else(|| "None recorded".to_string()),
                    }
                }
            }
        }

        if !detail.documents.is_empty() {
            div {
                style: CARD,
                h2 { style: HEADING, "Documents" }
                for document in detail.documents.clone() {
                    div {
                        key: "{document.id}",
                        style: "font-size: 0.875rem; padding: 0.125rem 0;",
                        if let Some(url) = document.file_url.clone() {
                            a { href: "{url}", target: "_blank", {document.file_name.clone().unwrap_or_else(|| url.clone())} }
                        } else {
                            {document.file_name.clone().unwrap_or_default()}
                        }
                    }
                }
            }
        }

        if let Some(declaration) = detail.declarations.clone() {
            div {
                style: CARD,
                h2 { style: HEADING, "Declarations" }
                Field { label: "Agreement", value: signed(declaration.agreement_sig_1, declaration.agreement_sig_2) }
                Field { label: "Funding", value: signed(declaration.funding_sig_1, declaration.funding_sig_2) }
                Field { label: "Declaration", value: signed(declaration.declaration_sig_1, declaration.declaration_sig_2) }
            }
        }

        div {
            style: CARD,
            div {
                style: "display: flex; align-items: baseline; justify-content: space-between;",
                h2 { style: HEADING, "Payments" }
                span { style: "font-size: 0.875rem; color: #047857; font-weight: 600;", "Total paid: £{total_paid}" }
            }
            PaymentForm { member_id: member.id.clone() }
            PaymentTable { payments: detail.payments.clone() }
        }

        if confirm_delete() {
            ModalOverlay {
                on_close: move |_| confirm_delete.set(false),
                h2 { style: "font-size: 1.125rem; font-weight: 600; margin: 0 0 0.5rem 0;", "Delete {name}?" }
                p {
                    style: "color: #4b5563; font-size: 0.875rem;",
                    "The member and everything recorded for them will be removed."
                }
                div {
                    style: "display: flex; justify-content: flex-end; gap: 0.5rem; margin-top: 1rem;",
                    button {
                        style: BUTTON,
                        onclick: move |_| confirm_delete.set(false),
                        "Cancel"
                    }
                    button {
                        style: "{BUTTON} background: #b91c1c; color: #fff; border-color: #b91c1c;",
                        onclick: move |_| {
                            confirm_delete.set(false);
                            delete.mutate(delete_id.clone());
                        },
                        "Delete"
                    }
                }
            }
        }
    }
}

fn join_address(parts: &[Option<&str>]) -> Option<String> {
    let joined = parts
        .iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    (!joined.is_empty()).then_some(joined)
}

fn signed(first: bool, second: bool) -> String {
    match (first, second) {
        (true, true) => "Signed by both applicants".to_string(),
        (true, false) => "Signed by main applicant".to_string(),
        (false, true) => "Signed by joint applicant".to_string(),
        (false, false) => "Not signed".to_string(),
    }
}

#[component]
fn Field(#[props(into)] label: String, #[props(into)] value: String) -> Element {
    rsx! {
        div {
            style: "display: flex; gap: 1rem; font-size: 0.875rem; padding: 0.125rem 0;",
            span { style: "width: 8rem; color: #6b7280;", "{label}" }
            span { "{value}" }
        }
    }
}

#[component]
fn ErrorBanner(message: String) -> Element {
    rsx! {
        div {
            style: "padding: 0.75rem; margin-bottom: 1rem; background: #fee2e2; color: #991b1b; border-radius: 4px;",
            "{message}"
        }
    }
}

#[component]
fn PaymentForm(member_id: RecordId) -> Element {
    let add_payment = use_add_payment();
    let auth = use_auth();
    let mut amount = use_signal(String::new);
    let mut method = use_signal(|| "card".to_string());
    let mut reference = use_signal(String::new);
    let mut invalid = use_signal(|| false);

    let mut submit = move |_| {
        let Ok(total_amount) = amount().trim().parse::<f64>() else {
            invalid.set(true);
            return;
        };
        if total_amount <= 0.0 {
            invalid.set(true);
            return;
        }
        invalid.set(false);

        let processed_by = auth.peek().profile.as_ref().map(|p| p.display_name().to_string());
        let reference_no = Some(reference()).filter(|r| !r.trim().is_empty());
        add_payment.mutate(NewPayment {
            member_id: member_id.clone(),
            payment_type: Some("membership".to_string()),
            payment_method: Some(method()),
            payment_status: PaymentStatus::Completed,
            main_joining_fee: None,
            main_membership_fee: None,
            joint_joining_fee: None,
            joint_membership_fee: None,
            late_fee: None,
            total_amount,
            payment_date: Some(Local::now().date_naive()),
            reference_no,
            processed_by,
            notes: None,
        });
        amount.set(String::new());
        reference.set(String::new());
    };

    let state = add_payment.state.read().clone();

    rsx! {
        form {
            style: "display: flex; flex-wrap: wrap; gap: 0.5rem; align-items: center; margin-bottom: 0.75rem;",
            onsubmit: move |evt| {
                evt.prevent_default();
                submit(());
            },
            input {
                style: "width: 7rem; padding: 0.375rem; border: 1px solid #d1d5db; border-radius: 4px;",
                placeholder: "Amount",
                value: "{amount}",
                oninput: move |evt| amount.set(evt.value()),
            }
            select {
                style: "padding: 0.375rem; border: 1px solid #d1d5db; border-radius: 4px;",
                value: "{method}",
                onchange: move |evt| method.set(evt.value()),
                option { value: "card", "Card" }
                option { value: "cash", "Cash" }
                option { value: "bank_transfer", "Bank transfer" }
                option { value: "cheque", "Cheque" }
            }
            input {
                style: "flex: 1; min-width: 8rem; padding: 0.375rem; border: 1px solid #d1d5db; border-radius: 4px;",
                placeholder: "Reference",
                value: "{reference}",
                oninput: move |evt| reference.set(evt.value()),
            }
            button {
                r#type: "submit",
                style: "{BUTTON} background: #059669; color: #fff; border-color: #059669;",
                disabled: state.is_pending(),
                "Record payment"
            }
            if invalid() {
                span { style: "color: #b91c1c; font-size: 0.875rem;", "Enter a positive amount" }
            }
            if let Some(error) = state.error.clone() {
                span { style: "color: #b91c1c; font-size: 0.875rem;", "Payment not saved: {error}" }
            }
        }
    }
}

#[component]
fn PaymentTable(payments: Vec<Payment>) -> Element {
    if payments.is_empty() {
        return rsx! {
            p { style: "color: #6b7280; font-size: 0.875rem;", "No payments recorded." }
        };
    }

    rsx! {
        table {
            style: "width: 100%; border-collapse: collapse; font-size: 0.875rem;",
            thead {
                tr {
                    style: "text-align: left; color: #6b7280;",
                    th { style: "padding: 0.375rem;", "Date" }
                    th { style: "padding: 0.375rem;", "Method" }
                    th { style: "padding: 0.375rem;", "Reference" }
                    th { style: "padding: 0.375rem;", "Status" }
                    th { style: "padding: 0.375rem; text-align: right;", "Amount" }
                }
            }
            tbody {
                for payment in payments {
                    PaymentRow { key: "{payment.id}", payment: payment.clone() }
                }
            }
        }
    }
}

#[component]
fn PaymentRow(payment: Payment) -> Element {
    let date = payment
        .details
        .payment_date
        .map(|d| d.format("%d/%m/%Y").to_string())
        .or_else(|| payment.created_at.map(|t| t.format("%d/%m/%Y").to_string()))
        .unwrap_or_default();
    let method = payment.details.payment_method.clone().unwrap_or_default();
    let reference = payment.details.reference_no.clone().unwrap_or_default();
    let amount = format!("{:.2}", payment.details.total_amount);
    // Still waiting for the server to assign an id.
    let opacity = if payment.id.is_placeholder() { "0.5" } else { "1" };

    rsx! {
        tr {
            style: "border-top: 1px solid #f3f4f6; opacity: {opacity};",
            td { style: "padding: 0.375rem;", "{date}" }
            td { style: "padding: 0.375rem;", "{method}" }
            td { style: "padding: 0.375rem;", "{reference}" }
            td { style: "padding: 0.375rem;", "{payment.details.payment_status}" }
            td { style: "padding: 0.375rem; text-align: right;", "£{amount}" }
        }
    }
}
